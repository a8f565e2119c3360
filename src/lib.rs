//! # evtablet
//!
//! Frame-consistent event dispatching for drawing-tablet input.
//!
//! The kernel reports tablet hardware as a flat stream of typed codes with
//! integer values, chopped into frames by synchronization markers. That
//! stream makes no promises a drawing application can build on: axis
//! updates, button transitions, and tool announcements arrive in whatever
//! order the driver produced them. This crate is the state machine in
//! between - one [`Dispatcher`] per device consumes the raw tuples and
//! emits a batched stream with clean boundaries:
//!
//! * a tool *enters* before anything it does, and *leaves* only after its
//!   button releases;
//! * presses precede the frame's motion, releases follow it;
//! * pressure is normalized to `[0, 1]` and tilt to `[-1, 1]` in
//!   deterministic [fixed-point](fixed::Fixed);
//! * distance and pressure never fight - contact wins;
//! * tools keep their identity across proximity cycles via `(type, serial)`.
//!
//! What this crate is *not*: it does not open devices, read file
//! descriptors, or deliver events anywhere. A device source hands it a
//! [capability descriptor](device::Capabilities), a raw reader feeds it
//! [`RawEvent`](events::RawEvent)s, and an [`EventSink`](events::EventSink)
//! of your choosing receives the output, synchronously and without
//! blocking.
//!
//! ```
//! use evtablet::{codes, device::{AbsInfo, Capabilities}, events::{RawEvent, TimedEvent}, Dispatcher};
//!
//! let caps = Capabilities::builder()
//!     .abs(codes::ABS_X, AbsInfo::new(0, 32_767))
//!     .abs(codes::ABS_Y, AbsInfo::new(0, 32_767))
//!     .abs(codes::ABS_PRESSURE, AbsInfo::new(0, 1023))
//!     .keys([codes::BTN_TOOL_PEN, codes::BTN_TOUCH])
//!     .build();
//! let mut dispatcher = Dispatcher::tablet(&caps)?;
//!
//! let mut sink: Vec<TimedEvent> = Vec::new();
//! for event in [
//!     RawEvent::key(codes::BTN_TOOL_PEN, 1, 0),
//!     RawEvent::abs(codes::ABS_X, 1000, 0),
//!     RawEvent::abs(codes::ABS_Y, 2000, 0),
//!     RawEvent::syn(0),
//! ] {
//!     dispatcher.process(&event, &mut sink);
//! }
//! # assert!(!sink.is_empty());
//! # Ok::<(), evtablet::InitError>(())
//! ```
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod axis;
pub mod button;
pub mod codes;
pub mod device;
mod dispatch;
pub mod events;
pub mod fixed;
mod frame;
mod sanitize;
pub mod tool;

use dispatch::{DeviceDispatch, DispatchKind};

/// Construction failed on metadata the dispatcher cannot work without.
///
/// This is the only fatal error surface. Everything at runtime is a
/// recovered diagnostic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The device advertised a capability but supplied no range metadata
    /// for an indispensable axis. Hardware or driver bug.
    #[error("no absolute axis metadata for indispensable code {code:#x}")]
    MissingMetadata { code: u16 },
}

/// A per-device input dispatcher.
///
/// Single-threaded by design: the owning runtime polls its raw reader and
/// drives `process` synchronously. Dispatchers for different devices are
/// fully independent. Dropping a dispatcher drops its tool registry and
/// frame state; no events are emitted after that.
pub struct Dispatcher {
    internal: DispatchKind,
}

impl Dispatcher {
    /// Build a dispatcher for a pen-tablet device from its capability
    /// descriptor.
    ///
    /// # Errors
    /// [`InitError::MissingMetadata`] when `ABS_X` or `ABS_Y` metadata is
    /// absent - a tablet that cannot report position is not a tablet.
    pub fn tablet(caps: &device::Capabilities) -> Result<Self, InitError> {
        Ok(Self {
            internal: DispatchKind::Tablet(dispatch::TabletDispatch::new(caps)?),
        })
    }

    /// Feed one raw tuple. Anything other than a synchronization marker
    /// only accumulates; the marker flushes the frame into `sink` in
    /// contract order.
    pub fn process(&mut self, event: &events::RawEvent, sink: &mut dyn events::EventSink) {
        self.internal.process(event, sink);
    }

    /// Feed a batch of raw tuples in order.
    pub fn process_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a events::RawEvent>,
        sink: &mut dyn events::EventSink,
    ) {
        for event in events {
            self.process(event, sink);
        }
    }

    /// The tool identities this device has seen, in insertion order.
    pub fn tools(&self) -> impl Iterator<Item = &tool::Tool> {
        self.internal.tools().tools()
    }

    /// Resolve a tool handle delivered in an event.
    #[must_use]
    pub fn tool(&self, id: tool::ToolId) -> Option<&tool::Tool> {
        self.internal.tools().get(id)
    }

    /// The tool currently in proximity, if any.
    #[must_use]
    pub fn active_tool(&self) -> Option<tool::ToolId> {
        self.internal.tools().active_tool()
    }

    /// Retain a tool identity beyond its time in the registry's hands.
    /// Pair with [`release_tool`](Self::release_tool); not thread-safe.
    pub fn acquire_tool(&mut self, tool_type: tool::ToolType, serial: u32) -> tool::ToolId {
        self.internal.tools_mut().acquire(tool_type, serial)
    }

    /// Drop a reference taken with [`acquire_tool`](Self::acquire_tool).
    pub fn release_tool(&mut self, id: tool::ToolId) {
        self.internal.tools_mut().release(id);
    }

    /// Range metadata for a raw axis code.
    ///
    /// # Errors
    /// [`axis::UnknownAxisError`] when the device never advertised it.
    pub fn axis_descriptor(
        &self,
        code: u16,
    ) -> Result<&axis::AxisDescriptor, axis::UnknownAxisError> {
        self.internal.axes().descriptor(code)
    }

    /// Committed absolute position in device units, clamped to the
    /// advertised range.
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        self.internal.position()
    }

    /// Whether the stylus tip is currently touching the surface.
    #[must_use]
    pub fn in_contact(&self) -> bool {
        self.internal.in_contact()
    }

    /// The most recently emitted normalized value for an axis.
    #[must_use]
    pub fn axis_value(&self, axis: axis::Axis) -> fixed::Fixed {
        self.internal.axis_value(axis)
    }
}
