//! The per-device state machine: classifies raw tuples, accumulates a frame,
//! and on the synchronization marker emits the frame in contract order.
//!
//! Emission order within a flush, fixed and observable:
//! tool entry, button presses (pad then stylus, ascending code), absolute
//! motion, axes in ascending logical order, button releases, tool exit,
//! frame terminator. The pre/post split is what gives consumers
//! enter-before-press and release-before-leave semantics.

use crate::{
    axis::{self, Axis, AxisRegistry},
    button::{ButtonGroup, ButtonMask},
    codes,
    device::Capabilities,
    events::{ButtonState, Event, EventSink, RawEvent, TimedEvent},
    fixed::Fixed,
    frame::{FrameState, Status, ToolTransition},
    sanitize::sanitize,
    tool::{ToolRegistry, ToolType},
};

/// What every dispatcher kind can do. The set of kinds is closed and small,
/// so this is static dispatch over [`DispatchKind`] rather than a trait
/// object zoo.
#[enum_dispatch::enum_dispatch]
pub(crate) trait DeviceDispatch {
    /// Feed one raw tuple. Emits into `sink` only when the tuple is a
    /// synchronization marker.
    fn process(&mut self, event: &RawEvent, sink: &mut dyn EventSink);
    #[must_use]
    fn tools(&self) -> &ToolRegistry;
    #[must_use]
    fn tools_mut(&mut self) -> &mut ToolRegistry;
    #[must_use]
    fn axes(&self) -> &AxisRegistry;
    /// Committed position in device units.
    #[must_use]
    fn position(&self) -> (i32, i32);
    #[must_use]
    fn in_contact(&self) -> bool;
    /// Most recently emitted normalized value for an axis.
    #[must_use]
    fn axis_value(&self, axis: Axis) -> Fixed;
}

/// Static dispatch between device kinds.
#[enum_dispatch::enum_dispatch(DeviceDispatch)]
pub(crate) enum DispatchKind {
    Tablet(TabletDispatch),
}

/// Dispatcher for pen-tablet devices.
pub(crate) struct TabletDispatch {
    axes: AxisRegistry,
    tools: ToolRegistry,
    frame: FrameState,
    /// Reserved axis codes already reported, one bit per code.
    quiet_reserved: u16,
}

impl TabletDispatch {
    pub(crate) fn new(caps: &Capabilities) -> Result<Self, crate::InitError> {
        Ok(Self {
            axes: AxisRegistry::new(caps)?,
            tools: ToolRegistry::default(),
            frame: FrameState::default(),
            quiet_reserved: 0,
        })
    }

    fn process_absolute(&mut self, event: &RawEvent) {
        match event.code {
            codes::ABS_X => {
                let value = self.clamp_position(Axis::X, event.value);
                self.frame.stage_position(Axis::X, value);
            }
            codes::ABS_Y => {
                let value = self.clamp_position(Axis::Y, event.value);
                self.frame.stage_position(Axis::Y, value);
            }
            code => {
                if let Some(desc) = self.axes.descriptor_mut(code) {
                    self.frame.stage_axis(desc, event.value);
                } else if let Some(first) = self.axes.note_missing_metadata(code) {
                    if first {
                        tracing::warn!(
                            code,
                            "axis advertised without metadata, dropping its samples"
                        );
                    }
                } else if Axis::is_reserved_code(code) {
                    if self.quiet_reserved & (1u16 << code) == 0 {
                        self.quiet_reserved |= 1u16 << code;
                        tracing::debug!(code, "reserved axis code, not yet mapped");
                    }
                } else {
                    tracing::debug!(code, "unhandled absolute axis code");
                }
            }
        }
    }

    fn process_key(&mut self, event: &RawEvent) {
        let pressed = event.value != 0;
        if let Some(tool_type) = ToolType::from_code(event.code) {
            match self.frame.stage_tool_type(tool_type, pressed) {
                ToolTransition::Entered | ToolTransition::Left => {}
                ToolTransition::AlreadyActive => {
                    tracing::debug!(?tool_type, "enable for the tool already staged");
                }
                ToolTransition::NotActive => {
                    tracing::debug!(?tool_type, "disable for a tool that is not staged");
                }
            }
        } else if event.code == codes::BTN_TOUCH {
            self.frame.stage_contact(pressed);
        } else if !self.frame.stage_button(event.code, pressed) {
            tracing::debug!(code = event.code, "unhandled button code");
        }
    }

    fn process_misc(&mut self, event: &RawEvent) {
        if event.code == codes::MSC_SERIAL {
            #[allow(clippy::cast_sign_loss)]
            self.frame.stage_serial(event.value as u32);
        } else {
            tracing::debug!(code = event.code, "unhandled misc event code");
        }
    }

    /// Position clamps at staging so the snapshot never holds a value the
    /// device's own range excludes; the accessor and the wire then agree.
    fn clamp_position(&self, axis: Axis, value: i32) -> i32 {
        self.axes
            .descriptor_for(axis)
            .map_or(value, |d| d.clamp(value))
    }

    /// A tool entered or swapped in this frame: announce it before anything
    /// it does. Also the point where the registry reference changes hands.
    fn notify_tool_entry(&mut self, time: u64, sink: &mut dyn EventSink) -> bool {
        let current = self.frame.current().tool_type;
        if current == self.frame.previous().tool_type {
            return false;
        }
        let Some(tool_type) = current else {
            return false;
        };
        let serial = self.frame.current().tool_serial;
        let id = self.tools.acquire(tool_type, serial);
        if let Some(old) = self.tools.active_tool() {
            if old != id {
                self.tools.release(old);
            }
        }
        self.tools.set_active(Some(id));
        sink.submit(TimedEvent {
            time,
            event: Event::ProximityIn { tool: id, serial },
        });
        true
    }

    /// The tool left this frame: announce it after its button releases. The
    /// registry keeps the identity at zero references so the same physical
    /// tool resolves to the same handle next time.
    fn notify_tool_exit(&mut self, time: u64, sink: &mut dyn EventSink) -> bool {
        let current = self.frame.current().tool_type;
        if current == self.frame.previous().tool_type || current.is_some() {
            return false;
        }
        sink.submit(TimedEvent {
            time,
            event: Event::ProximityOut,
        });
        if let Some(active) = self.tools.active_tool() {
            self.tools.release(active);
            self.tools.set_active(None);
        }
        true
    }

    fn notify_buttons(
        &mut self,
        time: u64,
        sink: &mut dyn EventSink,
        state: ButtonState,
    ) -> bool {
        let current = self.frame.current();
        let previous = self.frame.previous();
        let delta = |now: ButtonMask, before: ButtonMask| match state {
            ButtonState::Pressed => now.pressed_delta(before),
            ButtonState::Released => now.released_delta(before),
        };
        let pad = delta(current.pad_buttons, previous.pad_buttons);
        let stylus = delta(current.stylus_buttons, previous.stylus_buttons);

        let seat_count = u32::from(state == ButtonState::Pressed);
        let mut any = false;
        for (group, mask) in [(ButtonGroup::Pad, pad), (ButtonGroup::Stylus, stylus)] {
            for bit in mask.iter() {
                sink.submit(TimedEvent {
                    time,
                    event: Event::Button {
                        code: group.code_for_bit(bit),
                        state,
                        seat_count,
                    },
                });
                any = true;
            }
        }
        any
    }

    fn notify_axes(&mut self, time: u64, sink: &mut dyn EventSink) -> bool {
        let changed = self.frame.changed();
        let mut any = false;
        for axis in changed.iter_axes() {
            let Some(desc) = self.axes.descriptor_for(axis) else {
                continue;
            };
            // A changed axis has recorded at least one sample.
            let Some(raw) = desc.last_value() else {
                continue;
            };
            let value = match axis {
                Axis::Pressure => axis::normalize_pressure(raw, desc),
                Axis::TiltHorizontal | Axis::TiltVertical => {
                    axis::normalize_tilt(raw, desc)
                }
                Axis::Distance => axis::normalize_distance(raw, desc),
                // Position never enters the change set; it travels as
                // MotionAbsolute.
                Axis::X | Axis::Y => continue,
            };
            self.frame.write_axis_value(axis, value);
            sink.submit(TimedEvent {
                time,
                event: Event::Axis {
                    axis,
                    value,
                    changed,
                },
            });
            any = true;
        }
        any
    }

    /// Flush the open frame in contract order, then commit.
    fn flush(&mut self, time: u64, sink: &mut dyn EventSink) {
        let mut emitted = false;

        // A leaving tool takes its held buttons with it; the releases must
        // hit the wire before the proximity-out.
        if self.frame.current().tool_type.is_none() && self.frame.previous().tool_type.is_some() {
            self.frame.force_stylus_release();
        }

        // Pre-update notifications: entries and presses.
        emitted |= self.notify_tool_entry(time, sink);
        emitted |= self.notify_buttons(time, sink, ButtonState::Pressed);

        // Axis traffic means nothing without a tool to attribute it to.
        if self.frame.current().tool_type.is_some() {
            let pruned = sanitize(
                self.frame.changed(),
                &self.axes,
                self.frame.status().contains(Status::STYLUS_IN_CONTACT),
            );
            self.frame.set_changed(pruned);

            if self.frame.status().contains(Status::AXES_UPDATED) {
                let (x, y) = self.position_normalized();
                sink.submit(TimedEvent {
                    time,
                    event: Event::MotionAbsolute { x, y },
                });
                self.frame.clear_status(Status::AXES_UPDATED);
                emitted = true;
            }

            emitted |= self.notify_axes(time, sink);
        }

        // Post-update notifications: releases and exits.
        emitted |= self.notify_buttons(time, sink, ButtonState::Released);
        emitted |= self.notify_tool_exit(time, sink);

        if emitted {
            sink.submit(TimedEvent {
                time,
                event: Event::Frame,
            });
        }

        self.frame.commit();
    }

    fn position_normalized(&self) -> (Fixed, Fixed) {
        let snapshot = self.frame.current();
        // X and Y descriptors are guaranteed by construction.
        let x = self
            .axes
            .descriptor_for(Axis::X)
            .map_or(Fixed::from_int(snapshot.x), |d| {
                axis::normalize_position(snapshot.x, d)
            });
        let y = self
            .axes
            .descriptor_for(Axis::Y)
            .map_or(Fixed::from_int(snapshot.y), |d| {
                axis::normalize_position(snapshot.y, d)
            });
        (x, y)
    }
}

impl DeviceDispatch for TabletDispatch {
    fn process(&mut self, event: &RawEvent, sink: &mut dyn EventSink) {
        match event.event_type {
            codes::EV_ABS => self.process_absolute(event),
            codes::EV_KEY => self.process_key(event),
            codes::EV_MSC => self.process_misc(event),
            codes::EV_SYN => self.flush(event.time, sink),
            other => tracing::debug!(event_type = other, "unexpected event type"),
        }
    }

    fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    fn axes(&self) -> &AxisRegistry {
        &self.axes
    }

    fn position(&self) -> (i32, i32) {
        let snapshot = self.frame.current();
        (snapshot.x, snapshot.y)
    }

    fn in_contact(&self) -> bool {
        self.frame.status().contains(Status::STYLUS_IN_CONTACT)
    }

    fn axis_value(&self, axis: Axis) -> Fixed {
        self.frame.current().axes[axis as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceDispatch, TabletDispatch};
    use crate::{
        codes, device,
        events::{Event, RawEvent, TimedEvent},
        tool::ToolType,
    };

    fn dispatch() -> TabletDispatch {
        TabletDispatch::new(&device::test_tablet()).unwrap()
    }

    fn replay(dispatch: &mut TabletDispatch, events: &[RawEvent]) -> Vec<TimedEvent> {
        let mut sink: Vec<TimedEvent> = Vec::new();
        for event in events {
            dispatch.process(event, &mut sink);
        }
        sink
    }

    #[test]
    fn empty_flush_emits_nothing() {
        let mut dispatch = dispatch();
        let emitted = replay(&mut dispatch, &[RawEvent::syn(1)]);
        assert!(emitted.is_empty());
    }

    #[test]
    fn proximity_cycle_balances_tool_references() {
        let mut dispatch = dispatch();
        replay(
            &mut dispatch,
            &[
                RawEvent::key(codes::BTN_TOOL_PEN, 1, 1),
                RawEvent::msc(codes::MSC_SERIAL, 0xA1, 1),
                RawEvent::syn(1),
            ],
        );
        let id = dispatch.tools().active_tool().unwrap();
        assert_eq!(dispatch.tools().refcount(id), Some(1));

        replay(
            &mut dispatch,
            &[RawEvent::key(codes::BTN_TOOL_PEN, 0, 2), RawEvent::syn(2)],
        );
        assert_eq!(dispatch.tools().active_tool(), None);
        // Identity lingers for re-entry, unreferenced.
        assert_eq!(dispatch.tools().refcount(id), Some(0));
        assert_eq!(dispatch.tools().get(id).unwrap().tool_type(), ToolType::Pen);
    }

    #[test]
    fn tool_swap_emits_single_entry_and_swaps_reference() {
        let mut dispatch = dispatch();
        replay(
            &mut dispatch,
            &[RawEvent::key(codes::BTN_TOOL_PEN, 1, 1), RawEvent::syn(1)],
        );
        let pen = dispatch.tools().active_tool().unwrap();

        let emitted = replay(
            &mut dispatch,
            &[
                RawEvent::key(codes::BTN_TOOL_PEN, 0, 2),
                RawEvent::key(codes::BTN_TOOL_RUBBER, 1, 2),
                RawEvent::syn(2),
            ],
        );
        let rubber = dispatch.tools().active_tool().unwrap();
        assert_ne!(pen, rubber);
        assert_eq!(dispatch.tools().refcount(pen), Some(0));
        assert_eq!(dispatch.tools().refcount(rubber), Some(1));

        let entries: Vec<&Event> = emitted
            .iter()
            .filter_map(|e| match &e.event {
                ev @ Event::ProximityIn { .. } => Some(ev),
                Event::ProximityOut => Some(&Event::ProximityOut),
                _ => None,
            })
            .collect();
        assert_eq!(
            entries,
            vec![&Event::ProximityIn {
                tool: rubber,
                serial: 0
            }]
        );
    }

    #[test]
    fn reserved_and_unknown_codes_never_emit() {
        let mut dispatch = dispatch();
        let emitted = replay(
            &mut dispatch,
            &[
                RawEvent::key(codes::BTN_TOOL_PEN, 1, 1),
                RawEvent::abs(codes::ABS_WHEEL, 12, 1),
                RawEvent::abs(codes::ABS_RZ, 3, 1),
                RawEvent::abs(0x3f, 1, 1),
                RawEvent::key(0x2ff, 1, 1),
                RawEvent::new(0x15, 0, 0, 1),
                RawEvent::syn(1),
            ],
        );
        // Only the proximity announcement and its terminator survive.
        assert_eq!(emitted.len(), 2);
        assert!(matches!(emitted[0].event, Event::ProximityIn { .. }));
        assert!(matches!(emitted[1].event, Event::Frame));
    }
}
