//! The raw tuples the dispatcher consumes and the batched event stream it
//! emits.
//!
//! Emitted events within one frame follow a fixed order so consumers see
//! clean boundaries: a tool enters before anything it does, presses precede
//! axis motion, releases follow it, and a tool leaves only after its
//! releases. See [`Event`] for the vocabulary.

use crate::{
    axis::{Axis, AxisMask},
    codes,
    fixed::Fixed,
    tool::ToolId,
};

/// One raw kernel input tuple, the shape of `struct input_event` after the
/// reader has flattened the timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    /// `EV_*` type.
    pub event_type: u16,
    /// Type-specific code.
    pub code: u16,
    /// Sample value, button state, or serial payload.
    pub value: i32,
    /// Monotonic timestamp in the reader's granularity. Carried through to
    /// every event the frame emits.
    pub time: u64,
}

impl RawEvent {
    #[must_use]
    pub fn new(event_type: u16, code: u16, value: i32, time: u64) -> Self {
        Self {
            event_type,
            code,
            value,
            time,
        }
    }

    /// An `EV_ABS` sample.
    #[must_use]
    pub fn abs(code: u16, value: i32, time: u64) -> Self {
        Self::new(codes::EV_ABS, code, value, time)
    }

    /// An `EV_KEY` transition.
    #[must_use]
    pub fn key(code: u16, value: i32, time: u64) -> Self {
        Self::new(codes::EV_KEY, code, value, time)
    }

    /// An `EV_MSC` payload.
    #[must_use]
    pub fn msc(code: u16, value: i32, time: u64) -> Self {
        Self::new(codes::EV_MSC, code, value, time)
    }

    /// The synchronization marker terminating a frame.
    #[must_use]
    pub fn syn(time: u64) -> Self {
        Self::new(codes::EV_SYN, codes::SYN_REPORT, 0, time)
    }
}

/// Whether a button transition is a press or a release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// A high-level event emitted during a frame flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A tool entered sensing range, or replaced the previous tool. Always
    /// precedes everything else the tool does in the frame.
    ProximityIn {
        /// Registry handle; stable across proximity cycles of the same
        /// `(type, serial)` pair.
        tool: ToolId,
        serial: u32,
    },
    /// The tool left sensing range. Always follows the frame's button
    /// releases.
    ProximityOut,
    /// Absolute position in device units.
    MotionAbsolute { x: Fixed, y: Fixed },
    /// One continuous axis changed.
    Axis {
        axis: Axis,
        value: Fixed,
        /// Every logical axis that changed in this frame, after
        /// sanitization. The same set is carried on each axis event of the
        /// frame.
        changed: AxisMask,
    },
    /// A pad or stylus button transition, identified by raw code.
    Button {
        code: u16,
        state: ButtonState,
        /// Concurrently-pressed count for this code as visible to the
        /// dispatcher after the transition.
        seat_count: u32,
    },
    /// Terminates every flush that emitted at least one other event.
    Frame,
}

/// An [`Event`] stamped with the raw timestamp of the frame that produced
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedEvent {
    pub time: u64,
    pub event: Event,
}

/// Receives emitted events during a flush.
///
/// `submit` must not block: the dispatcher owns no buffer and will not wait.
/// A sink that needs to do I/O queues internally.
pub trait EventSink {
    fn submit(&mut self, event: TimedEvent);
}

impl EventSink for Vec<TimedEvent> {
    fn submit(&mut self, event: TimedEvent) {
        self.push(event);
    }
}

impl<A: smallvec::Array<Item = TimedEvent>> EventSink for smallvec::SmallVec<A> {
    fn submit(&mut self, event: TimedEvent) {
        self.push(event);
    }
}
