//! Device metadata consumed at dispatcher construction.
//!
//! A device source (evdev, a test fixture, a replay file) describes what the
//! hardware advertises: which absolute axes exist and their ranges, and which
//! key codes the device can report. The dispatcher seeds its axis registry
//! from this and refuses stage operations for anything not advertised.

use crate::{
    axis::{Axis, AxisMask},
    codes,
    tool::ToolType,
};

/// Per-axis range metadata, the shape of the kernel's `input_absinfo`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbsInfo {
    /// Inclusive minimum raw value.
    pub minimum: i32,
    /// Inclusive maximum raw value.
    pub maximum: i32,
    /// Units per millimeter for positions, unspecified for other axes.
    pub resolution: i32,
    /// Noise filter window as reported by the kernel. Carried for consumers;
    /// the dispatcher applies no filtering.
    pub fuzz: i32,
    /// Dead-zone size as reported by the kernel. Carried, unused.
    pub flat: i32,
}

impl AbsInfo {
    #[must_use]
    pub fn new(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution: i32) -> Self {
        self.resolution = resolution;
        self
    }
}

/// The capability descriptor of one device: advertised absolute axes (with
/// their metadata, when the driver provided any) and advertised key codes.
#[derive(Clone, Debug, Default)]
pub struct Capabilities {
    // Small and queried rarely, so plain vecs with linear scans. Keyed vecs
    // stay in advertisement order which is handy when logging.
    abs: Vec<(u16, Option<AbsInfo>)>,
    keys: Vec<u16>,
}

impl Capabilities {
    #[must_use]
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Metadata for an advertised absolute axis. `None` when the axis is not
    /// advertised *or* is advertised without absinfo (a driver bug the
    /// dispatcher tolerates).
    #[must_use]
    pub fn abs_info(&self, code: u16) -> Option<&AbsInfo> {
        self.abs
            .iter()
            .find(|(c, _)| *c == code)
            .and_then(|(_, info)| info.as_ref())
    }

    /// True if the device advertises the absolute axis at all, with or
    /// without metadata.
    #[must_use]
    pub fn advertises_abs(&self, code: u16) -> bool {
        self.abs.iter().any(|(c, _)| *c == code)
    }

    #[must_use]
    pub fn has_key(&self, code: u16) -> bool {
        self.keys.contains(&code)
    }

    /// Advertised absolute codes in advertisement order.
    pub(crate) fn abs_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.abs.iter().map(|(code, _)| *code)
    }

    /// Summary of the logical axes this device can report.
    #[must_use]
    pub fn available_axes(&self) -> AxisMask {
        self.abs
            .iter()
            .filter_map(|(code, _)| Axis::from_raw_code(*code))
            .fold(AxisMask::empty(), |mask, axis| mask | axis.into())
    }

    /// Tool types this device can announce, judged from its key capability
    /// set. Reported capabilities sometimes lie in both directions, so treat
    /// this as a hint rather than a contract.
    pub fn tool_types(&self) -> impl Iterator<Item = ToolType> + '_ {
        self.keys.iter().filter_map(|code| ToolType::from_code(*code))
    }
}

/// Assembles a [`Capabilities`] from whatever the device source dug up.
#[derive(Default)]
pub struct CapabilitiesBuilder {
    caps: Capabilities,
}

impl CapabilitiesBuilder {
    /// Advertise an absolute axis with its range metadata.
    #[must_use]
    pub fn abs(mut self, code: u16, info: AbsInfo) -> Self {
        self.caps.abs.retain(|(c, _)| *c != code);
        self.caps.abs.push((code, Some(info)));
        self
    }

    /// Advertise an absolute axis for which the driver supplied no absinfo.
    /// Hardware like this exists; the dispatcher drops such axes after a
    /// single diagnostic.
    #[must_use]
    pub fn abs_without_info(mut self, code: u16) -> Self {
        self.caps.abs.retain(|(c, _)| *c != code);
        self.caps.abs.push((code, None));
        self
    }

    /// Advertise a key code.
    #[must_use]
    pub fn key(mut self, code: u16) -> Self {
        if !self.caps.keys.contains(&code) {
            self.caps.keys.push(code);
        }
        self
    }

    /// Advertise several key codes at once.
    #[must_use]
    pub fn keys(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        for code in codes {
            self = self.key(code);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Capabilities {
        self.caps
    }
}

/// A plausible pen tablet, for tests and documentation examples.
#[cfg(test)]
pub(crate) fn test_tablet() -> Capabilities {
    Capabilities::builder()
        .abs(codes::ABS_X, AbsInfo::new(0, 32_767).with_resolution(200))
        .abs(codes::ABS_Y, AbsInfo::new(0, 32_767).with_resolution(200))
        .abs(codes::ABS_PRESSURE, AbsInfo::new(0, 1023))
        .abs(codes::ABS_DISTANCE, AbsInfo::new(0, 63))
        .abs(codes::ABS_TILT_X, AbsInfo::new(-64, 63))
        .abs(codes::ABS_TILT_Y, AbsInfo::new(-64, 63))
        .keys([
            codes::BTN_TOOL_PEN,
            codes::BTN_TOOL_RUBBER,
            codes::BTN_TOUCH,
            codes::BTN_STYLUS,
            codes::BTN_STYLUS2,
            codes::BTN_MISC,
            codes::BTN_MISC + 1,
        ])
        .build()
}

#[cfg(test)]
mod tests {
    use super::{test_tablet, AbsInfo, Capabilities};
    use crate::{
        axis::AxisMask,
        codes,
        tool::ToolType,
    };

    #[test]
    fn advertised_axes_summarized() {
        let caps = test_tablet();
        assert_eq!(
            caps.available_axes(),
            AxisMask::X
                | AxisMask::Y
                | AxisMask::PRESSURE
                | AxisMask::DISTANCE
                | AxisMask::TILT_HORIZONTAL
                | AxisMask::TILT_VERTICAL
        );
    }

    #[test]
    fn tool_types_follow_key_caps() {
        let caps = test_tablet();
        let types: Vec<ToolType> = caps.tool_types().collect();
        assert_eq!(types, vec![ToolType::Pen, ToolType::Rubber]);
    }

    #[test]
    fn absinfo_lookup_distinguishes_missing_metadata() {
        let caps = Capabilities::builder()
            .abs(codes::ABS_X, AbsInfo::new(0, 100))
            .abs_without_info(codes::ABS_PRESSURE)
            .build();
        assert!(caps.advertises_abs(codes::ABS_PRESSURE));
        assert!(caps.abs_info(codes::ABS_PRESSURE).is_none());
        assert!(caps.abs_info(codes::ABS_X).is_some());
        assert!(!caps.advertises_abs(codes::ABS_DISTANCE));
    }
}
