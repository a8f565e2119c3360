//! Logical axes, their per-device metadata, and raw-to-logical value
//! normalization.
//!
//! Raw evdev samples arrive as bounded integers; consumers want stable units.
//! Pressure leaves as `[0, 1]`, tilt as `[-1, 1]`, position and distance stay
//! in device units. All of it rides in [`Fixed`] so results are deterministic
//! across platforms.

use crate::{codes, fixed::Fixed};

bitflags::bitflags! {
    /// Bitflags over logical axes. Doubles as the per-frame change set and
    /// the `changed` payload on emitted axis events.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct AxisMask: u16 {
        const X = 1;
        const Y = 2;
        const DISTANCE = 4;
        const PRESSURE = 8;
        const TILT_HORIZONTAL = 16;
        const TILT_VERTICAL = 32;
    }
}

impl AxisMask {
    /// Iterate the contained axes in ascending logical order.
    pub fn iter_axes(&self) -> impl Iterator<Item = Axis> {
        self.intersection(Self::all()).iter().map(|flag| match flag {
            Self::X => Axis::X,
            Self::Y => Axis::Y,
            Self::DISTANCE => Axis::Distance,
            Self::PRESSURE => Axis::Pressure,
            Self::TILT_HORIZONTAL => Axis::TiltHorizontal,
            Self::TILT_VERTICAL => Axis::TiltVertical,
            // We know this is exhaustive due to intersection(all)
            _ => unreachable!(),
        })
    }
}

/// An individual logical axis.
///
/// Declaration order is the emission order within a frame, and is part of
/// the output contract.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumCount,
    strum::EnumIter,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
pub enum Axis {
    /// Absolute horizontal position, device units.
    X,
    /// Absolute vertical position, device units.
    Y,
    /// Perpendicular distance from the pad surface, device units.
    ///
    /// # Quirks
    /// Hardware keeps reporting nonzero distance below the contact threshold;
    /// the dispatcher suppresses it whenever pressure also changed.
    Distance,
    /// Force on the nib, normalized to `[0, 1]`.
    Pressure,
    /// Left-right tilt from perpendicular, normalized to `[-1, 1]`.
    TiltHorizontal,
    /// Forward-back tilt from perpendicular, normalized to `[-1, 1]`.
    TiltVertical,
}

impl Axis {
    /// Map a raw `EV_ABS` code to its logical axis, if one exists.
    #[must_use]
    pub fn from_raw_code(code: u16) -> Option<Self> {
        match code {
            codes::ABS_X => Some(Self::X),
            codes::ABS_Y => Some(Self::Y),
            codes::ABS_DISTANCE => Some(Self::Distance),
            codes::ABS_PRESSURE => Some(Self::Pressure),
            codes::ABS_TILT_X => Some(Self::TiltHorizontal),
            codes::ABS_TILT_Y => Some(Self::TiltVertical),
            _ => None,
        }
    }

    /// Raw codes the kernel defines for tablets that have no logical mapping
    /// yet. They are accepted and dropped rather than flagged as unknown.
    #[must_use]
    pub fn is_reserved_code(code: u16) -> bool {
        matches!(
            code,
            codes::ABS_RX
                | codes::ABS_RY
                | codes::ABS_RZ
                | codes::ABS_WHEEL
                | codes::ABS_THROTTLE
        )
    }
}

impl From<Axis> for AxisMask {
    fn from(value: Axis) -> Self {
        match value {
            Axis::X => AxisMask::X,
            Axis::Y => AxisMask::Y,
            Axis::Distance => AxisMask::DISTANCE,
            Axis::Pressure => AxisMask::PRESSURE,
            Axis::TiltHorizontal => AxisMask::TILT_HORIZONTAL,
            Axis::TiltVertical => AxisMask::TILT_VERTICAL,
        }
    }
}

/// A raw `EV_ABS` code was used that the device never advertised.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("axis code {code:#x} not advertised by the device")]
pub struct UnknownAxisError {
    pub code: u16,
}

/// One advertised axis: immutable range metadata plus the most recent raw
/// sample.
#[derive(Clone, Copy, Debug)]
pub struct AxisDescriptor {
    raw_code: u16,
    axis: Axis,
    minimum: i32,
    maximum: i32,
    resolution: i32,
    /// `None` until the axis reports for the first time.
    last_value: Option<i32>,
}

impl AxisDescriptor {
    #[must_use]
    pub fn raw_code(&self) -> u16 {
        self.raw_code
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub fn minimum(&self) -> i32 {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> i32 {
        self.maximum
    }

    #[must_use]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    /// The most recent raw sample staged on this axis, clamped to range.
    /// `None` if the axis has never reported.
    #[must_use]
    pub fn last_value(&self) -> Option<i32> {
        self.last_value
    }

    /// Clamp a raw sample into the advertised range.
    #[must_use]
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.minimum, self.maximum)
    }

    /// Record a clamped sample. Returns whether the stored value actually
    /// changed - the first sample ever seen always counts as a change, and
    /// afterwards a sample equal to the stored value is a no-op that must
    /// not dirty the frame.
    pub(crate) fn record(&mut self, value: i32) -> bool {
        let clamped = self.clamp(value);
        let changed = self.last_value != Some(clamped);
        self.last_value = Some(clamped);
        changed
    }
}

/// Per-device table mapping raw axis codes to logical descriptors.
///
/// Built once from the capability descriptor; metadata is read-only
/// afterwards. Advertised axes with no absinfo (driver bugs) are remembered
/// so their samples can be dropped with a single diagnostic.
#[derive(Debug)]
pub struct AxisRegistry {
    // A handful of entries, linear scans win over anything fancier.
    descriptors: smallvec::SmallVec<[AxisDescriptor; 6]>,
    missing: smallvec::SmallVec<[(u16, bool); 2]>,
}

impl AxisRegistry {
    pub(crate) fn new(caps: &crate::device::Capabilities) -> Result<Self, crate::InitError> {
        let mut descriptors: smallvec::SmallVec<[AxisDescriptor; 6]> = smallvec::SmallVec::new();
        let mut missing: smallvec::SmallVec<[(u16, bool); 2]> = smallvec::SmallVec::new();
        for code in caps.abs_codes() {
            let Some(axis) = Axis::from_raw_code(code) else {
                continue;
            };
            match caps.abs_info(code) {
                Some(info) => descriptors.push(AxisDescriptor {
                    raw_code: code,
                    axis,
                    minimum: info.minimum,
                    maximum: info.maximum,
                    resolution: info.resolution,
                    last_value: None,
                }),
                // X and Y are indispensable; anything else limps along.
                None if matches!(axis, Axis::X | Axis::Y) => {
                    return Err(crate::InitError::MissingMetadata { code });
                }
                None => missing.push((code, false)),
            }
        }
        for indispensable in [codes::ABS_X, codes::ABS_Y] {
            if !descriptors.iter().any(|d| d.raw_code == indispensable) {
                return Err(crate::InitError::MissingMetadata {
                    code: indispensable,
                });
            }
        }
        Ok(Self {
            descriptors,
            missing,
        })
    }

    /// The logical axis a raw code maps to, if the device advertised it with
    /// usable metadata.
    #[must_use]
    pub fn logical_for(&self, code: u16) -> Option<Axis> {
        self.descriptors
            .iter()
            .find(|d| d.raw_code == code)
            .map(AxisDescriptor::axis)
    }

    /// Range metadata for a raw code.
    ///
    /// # Errors
    /// `UnknownAxisError` when the device did not advertise the code (or
    /// advertised it without metadata).
    pub fn descriptor(&self, code: u16) -> Result<&AxisDescriptor, UnknownAxisError> {
        self.descriptors
            .iter()
            .find(|d| d.raw_code == code)
            .ok_or(UnknownAxisError { code })
    }

    pub(crate) fn descriptor_mut(&mut self, code: u16) -> Option<&mut AxisDescriptor> {
        self.descriptors.iter_mut().find(|d| d.raw_code == code)
    }

    pub(crate) fn descriptor_for(&self, axis: Axis) -> Option<&AxisDescriptor> {
        self.descriptors.iter().find(|d| d.axis == axis)
    }

    /// True on the first sample for an advertised-without-metadata code,
    /// false on every later one. Callers log on `true` and stay quiet after.
    pub(crate) fn note_missing_metadata(&mut self, code: u16) -> Option<bool> {
        let entry = self.missing.iter_mut().find(|(c, _)| *c == code)?;
        let first = !entry.1;
        entry.1 = true;
        Some(first)
    }
}

/// Normalize a pressure sample: `min` maps to 0, `max` maps to 1, linearly.
#[must_use]
pub fn normalize_pressure(value: i32, desc: &AxisDescriptor) -> Fixed {
    let range = f64::from(desc.maximum()) - f64::from(desc.minimum());
    let offset = f64::from(desc.clamp(value)) - f64::from(desc.minimum());
    Fixed::from_f64(offset / range)
}

/// Normalize a tilt sample symmetrically around the range midpoint: `min`
/// maps to exactly -1 and `max` to exactly +1, even for asymmetric ranges.
#[must_use]
pub fn normalize_tilt(value: i32, desc: &AxisDescriptor) -> Fixed {
    let half_range = (f64::from(desc.maximum()) - f64::from(desc.minimum())) / 2.0;
    let offset = f64::from(desc.clamp(value)) - f64::from(desc.minimum());
    Fixed::from_f64((offset - half_range) / half_range)
}

/// Positions pass through in device units; display mapping is the
/// consumer's business.
#[must_use]
pub fn normalize_position(value: i32, desc: &AxisDescriptor) -> Fixed {
    Fixed::from_int(desc.clamp(value))
}

/// Distance passes through in device units.
#[must_use]
pub fn normalize_distance(value: i32, desc: &AxisDescriptor) -> Fixed {
    Fixed::from_int(desc.clamp(value))
}

#[cfg(test)]
mod tests {
    use super::{normalize_distance, normalize_pressure, normalize_tilt, Axis, AxisMask, AxisRegistry};
    use crate::{codes, device, fixed::Fixed};

    fn registry() -> AxisRegistry {
        AxisRegistry::new(&device::test_tablet()).unwrap()
    }

    #[test]
    fn pressure_endpoints_are_exact() {
        let registry = registry();
        let desc = registry.descriptor(codes::ABS_PRESSURE).unwrap();
        assert_eq!(normalize_pressure(0, desc), Fixed::ZERO);
        assert_eq!(normalize_pressure(1023, desc), Fixed::ONE);
    }

    #[test]
    fn tilt_endpoints_are_exact_for_asymmetric_range() {
        let registry = registry();
        // test_tablet declares tilt in [-64, 63].
        let desc = registry.descriptor(codes::ABS_TILT_X).unwrap();
        assert_eq!(normalize_tilt(-64, desc), Fixed::from_f64(-1.0));
        assert_eq!(normalize_tilt(63, desc), Fixed::from_f64(1.0));
    }

    #[test]
    fn normalization_clamps_out_of_range_input() {
        let registry = registry();
        let desc = registry.descriptor(codes::ABS_DISTANCE).unwrap();
        assert_eq!(normalize_distance(99_999, desc), Fixed::from_int(63));
        assert_eq!(normalize_distance(-5, desc), Fixed::from_int(0));
    }

    #[test]
    fn equal_sample_is_a_no_op() {
        let mut registry = registry();
        let desc = registry.descriptor_mut(codes::ABS_PRESSURE).unwrap();
        assert!(desc.record(100));
        assert!(!desc.record(100));
        assert!(desc.record(101));
    }

    #[test]
    fn first_sample_is_always_a_change() {
        let mut registry = registry();
        // The range minimum is a legitimate first observation, not a repeat.
        let desc = registry.descriptor_mut(codes::ABS_TILT_X).unwrap();
        assert_eq!(desc.last_value(), None);
        assert!(desc.record(-64));
        assert_eq!(desc.last_value(), Some(-64));
        assert!(!desc.record(-64));
    }

    #[test]
    fn unadvertised_code_is_unknown() {
        let registry = registry();
        assert_eq!(
            registry.descriptor(codes::ABS_WHEEL).unwrap_err().code,
            codes::ABS_WHEEL
        );
        assert!(registry.logical_for(codes::ABS_WHEEL).is_none());
    }

    #[test]
    fn missing_position_metadata_is_fatal() {
        let caps = device::Capabilities::builder()
            .abs(codes::ABS_X, device::AbsInfo::new(0, 100))
            .build();
        assert!(matches!(
            AxisRegistry::new(&caps),
            Err(crate::InitError::MissingMetadata { code: codes::ABS_Y })
        ));
    }

    #[test]
    fn missing_axis_metadata_warns_once() {
        let caps = device::Capabilities::builder()
            .abs(codes::ABS_X, device::AbsInfo::new(0, 100))
            .abs(codes::ABS_Y, device::AbsInfo::new(0, 100))
            .abs_without_info(codes::ABS_PRESSURE)
            .build();
        let mut registry = AxisRegistry::new(&caps).unwrap();
        assert_eq!(
            registry.note_missing_metadata(codes::ABS_PRESSURE),
            Some(true)
        );
        assert_eq!(
            registry.note_missing_metadata(codes::ABS_PRESSURE),
            Some(false)
        );
        assert_eq!(registry.note_missing_metadata(codes::ABS_DISTANCE), None);
    }

    #[test]
    fn mask_iterates_in_logical_order() {
        let mask = AxisMask::TILT_VERTICAL | AxisMask::DISTANCE | AxisMask::PRESSURE;
        let axes: Vec<Axis> = mask.iter_axes().collect();
        assert_eq!(axes, vec![Axis::Distance, Axis::Pressure, Axis::TiltVertical]);
    }
}
