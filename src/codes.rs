//! The subset of the kernel input event vocabulary this crate speaks.
//!
//! These mirror `linux/input-event-codes.h` so that raw readers built on any
//! evdev binding can feed the dispatcher without a conversion table.

/// Event type: synchronization marker, terminates a frame.
pub const EV_SYN: u16 = 0x00;
/// Event type: key or button transition.
pub const EV_KEY: u16 = 0x01;
/// Event type: absolute axis sample.
pub const EV_ABS: u16 = 0x03;
/// Event type: miscellaneous, carries the tool serial.
pub const EV_MSC: u16 = 0x04;

/// `EV_SYN` code concluding a coherent set of updates.
pub const SYN_REPORT: u16 = 0x00;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_THROTTLE: u16 = 0x06;
pub const ABS_WHEEL: u16 = 0x08;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_DISTANCE: u16 = 0x19;
pub const ABS_TILT_X: u16 = 0x1a;
pub const ABS_TILT_Y: u16 = 0x1b;

/// First pad button code. Pad buttons occupy `[BTN_MISC, BTN_TASK]`.
pub const BTN_MISC: u16 = 0x100;
/// Last pad button code.
pub const BTN_TASK: u16 = 0x117;

pub const BTN_TOOL_PEN: u16 = 0x140;
pub const BTN_TOOL_RUBBER: u16 = 0x141;
pub const BTN_TOOL_BRUSH: u16 = 0x142;
pub const BTN_TOOL_PENCIL: u16 = 0x143;
pub const BTN_TOOL_AIRBRUSH: u16 = 0x144;
pub const BTN_TOOL_FINGER: u16 = 0x145;
pub const BTN_TOOL_MOUSE: u16 = 0x146;
pub const BTN_TOOL_LENS: u16 = 0x147;

/// Tip contact. Doubles as the first stylus button code; stylus buttons
/// occupy `[BTN_TOUCH, BTN_STYLUS2]`.
pub const BTN_TOUCH: u16 = 0x14a;
pub const BTN_STYLUS: u16 = 0x14b;
pub const BTN_STYLUS2: u16 = 0x14c;

/// `EV_MSC` code reporting the hardware serial of the tool in proximity.
pub const MSC_SERIAL: u16 = 0x00;
