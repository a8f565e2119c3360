//! Per-frame accumulation state: the current and previous snapshots, the
//! change set, and the staging operations the dispatcher drives between
//! synchronization markers.

use crate::{
    axis::{Axis, AxisDescriptor, AxisMask},
    button::{ButtonGroup, ButtonMask},
    fixed::Fixed,
    tool::ToolType,
};
use strum::EnumCount;

bitflags::bitflags! {
    /// Dispatcher status flags, set by stage operations and consumed at
    /// flush.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Position was written this frame.
        const AXES_UPDATED = 1;
        /// The stylus tip is touching the surface.
        const STYLUS_IN_CONTACT = 2;
        /// A tool announced itself and is being interacted with.
        const INTERACTED = 4;
    }
}

/// What a tool announcement did to the staged state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolTransition {
    /// The announced tool became the staged tool.
    Entered,
    /// The staged tool was withdrawn.
    Left,
    /// Enable for the tool that is already staged. State untouched.
    AlreadyActive,
    /// Disable for a tool that is not staged. State untouched.
    NotActive,
}

/// One coherent view of the device: everything a frame can change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub x: i32,
    pub y: i32,
    /// Normalized values per logical axis, written as axes are emitted.
    pub axes: [Fixed; Axis::COUNT],
    pub stylus_buttons: ButtonMask,
    pub pad_buttons: ButtonMask,
    /// `None` encodes "no tool" - nothing in proximity.
    pub tool_type: Option<ToolType>,
    pub tool_serial: u32,
    pub in_contact: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            axes: [Fixed::ZERO; Axis::COUNT],
            stylus_buttons: ButtonMask::EMPTY,
            pad_buttons: ButtonMask::EMPTY,
            tool_type: None,
            tool_serial: 0,
            in_contact: false,
        }
    }
}

/// Current-vs-previous frame state plus the change set for the open frame.
#[derive(Default)]
pub struct FrameState {
    current: Snapshot,
    previous: Snapshot,
    changed: AxisMask,
    status: Status,
}

impl FrameState {
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    pub fn changed(&self) -> AxisMask {
        self.changed
    }

    /// Replace the change set wholesale; the sanitizer prunes through this.
    pub fn set_changed(&mut self, changed: AxisMask) {
        self.changed = changed;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn clear_status(&mut self, flags: Status) {
        self.status.remove(flags);
    }

    /// Write a position coordinate, already clamped by the caller. Position
    /// dirties the frame even when the coordinate repeats; hardware resends
    /// it on every report and motion consumers want that cadence.
    pub fn stage_position(&mut self, axis: Axis, value: i32) {
        debug_assert!(matches!(axis, Axis::X | Axis::Y));
        match axis {
            Axis::X => self.current.x = value,
            _ => self.current.y = value,
        }
        self.status.insert(Status::AXES_UPDATED);
    }

    /// Record a non-position axis sample through its descriptor. Clamps to
    /// the advertised range; a sample equal to the stored value does not
    /// mark the axis changed.
    pub fn stage_axis(&mut self, desc: &mut AxisDescriptor, value: i32) {
        if desc.record(value) {
            self.changed.insert(desc.axis().into());
        }
    }

    /// Toggle a button bit. Returns `false` for codes outside both button
    /// ranges, which the caller reports as a diagnostic.
    pub fn stage_button(&mut self, code: u16, pressed: bool) -> bool {
        let Some((group, bit)) = ButtonGroup::classify(code) else {
            return false;
        };
        match group {
            ButtonGroup::Pad => self.current.pad_buttons.set(bit, pressed),
            ButtonGroup::Stylus => self.current.stylus_buttons.set(bit, pressed),
        }
        true
    }

    /// Apply a `BTN_TOOL_*` announcement.
    pub fn stage_tool_type(&mut self, tool_type: ToolType, enabled: bool) -> ToolTransition {
        if enabled {
            if self.current.tool_type == Some(tool_type) {
                return ToolTransition::AlreadyActive;
            }
            self.current.tool_type = Some(tool_type);
            self.status.insert(Status::INTERACTED);
            ToolTransition::Entered
        } else {
            if self.current.tool_type != Some(tool_type) {
                return ToolTransition::NotActive;
            }
            self.current.tool_type = None;
            self.status.remove(Status::INTERACTED);
            ToolTransition::Left
        }
    }

    pub fn stage_serial(&mut self, serial: u32) {
        self.current.tool_serial = serial;
    }

    /// Tip contact doubles as the first stylus button, so it both flips the
    /// contact status and stages the touch bit.
    pub fn stage_contact(&mut self, pressed: bool) {
        self.status.set(Status::STYLUS_IN_CONTACT, pressed);
        self.current.in_contact = pressed;
        self.stage_button(crate::codes::BTN_TOUCH, pressed);
    }

    /// A tool leaving proximity cannot keep buttons held. Clearing the
    /// stylus population here makes the flush report the releases before
    /// the proximity-out, whether or not the kernel ever sent them.
    pub fn force_stylus_release(&mut self) {
        self.current.stylus_buttons = ButtonMask::EMPTY;
        self.current.in_contact = false;
        self.status.remove(Status::STYLUS_IN_CONTACT);
    }

    /// Store the normalized value emitted for an axis this frame.
    pub fn write_axis_value(&mut self, axis: Axis, value: Fixed) {
        self.current.axes[axis as usize] = value;
    }

    /// Close the frame: the current snapshot becomes the previous one and
    /// per-frame dirt is cleared.
    pub fn commit(&mut self) {
        self.previous = self.current;
        self.changed = AxisMask::empty();
        self.status.remove(Status::AXES_UPDATED);
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameState, Status, ToolTransition};
    use crate::{
        axis::{Axis, AxisMask, AxisRegistry},
        codes, device,
        tool::ToolType,
    };

    fn state_and_registry() -> (FrameState, AxisRegistry) {
        (
            FrameState::default(),
            AxisRegistry::new(&device::test_tablet()).unwrap(),
        )
    }

    #[test]
    fn commit_aligns_snapshots_and_clears_dirt() {
        let (mut frame, mut registry) = state_and_registry();
        frame.stage_position(Axis::X, 100);
        frame.stage_axis(registry.descriptor_mut(codes::ABS_PRESSURE).unwrap(), 5);
        frame.stage_button(codes::BTN_STYLUS, true);
        assert_eq!(frame.changed(), AxisMask::PRESSURE);
        assert!(frame.status().contains(Status::AXES_UPDATED));

        frame.commit();
        assert_eq!(frame.current(), frame.previous());
        assert_eq!(frame.changed(), AxisMask::empty());
        assert!(!frame.status().contains(Status::AXES_UPDATED));
    }

    #[test]
    fn tool_transitions_report_stray_announcements() {
        let (mut frame, _) = state_and_registry();
        assert_eq!(
            frame.stage_tool_type(ToolType::Pen, true),
            ToolTransition::Entered
        );
        assert_eq!(
            frame.stage_tool_type(ToolType::Pen, true),
            ToolTransition::AlreadyActive
        );
        assert_eq!(
            frame.stage_tool_type(ToolType::Rubber, false),
            ToolTransition::NotActive
        );
        assert_eq!(frame.current().tool_type, Some(ToolType::Pen));
        assert!(frame.status().contains(Status::INTERACTED));

        assert_eq!(
            frame.stage_tool_type(ToolType::Pen, false),
            ToolTransition::Left
        );
        assert_eq!(frame.current().tool_type, None);
        assert!(!frame.status().contains(Status::INTERACTED));
    }

    #[test]
    fn tool_swap_replaces_in_place() {
        let (mut frame, _) = state_and_registry();
        frame.stage_tool_type(ToolType::Pen, true);
        assert_eq!(
            frame.stage_tool_type(ToolType::Rubber, true),
            ToolTransition::Entered
        );
        assert_eq!(frame.current().tool_type, Some(ToolType::Rubber));
    }

    #[test]
    fn contact_stages_the_touch_button() {
        let (mut frame, _) = state_and_registry();
        frame.stage_contact(true);
        assert!(frame.status().contains(Status::STYLUS_IN_CONTACT));
        assert!(frame.current().in_contact);
        assert!(frame.current().stylus_buttons.contains(0));

        frame.stage_contact(false);
        assert!(!frame.status().contains(Status::STYLUS_IN_CONTACT));
        assert!(!frame.current().stylus_buttons.contains(0));
    }

    #[test]
    fn unknown_button_is_rejected() {
        let (mut frame, _) = state_and_registry();
        assert!(!frame.stage_button(0x1ff, true));
        assert!(frame.current().pad_buttons.is_empty());
        assert!(frame.current().stylus_buttons.is_empty());
    }
}
