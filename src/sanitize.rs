//! Cross-axis fixups applied once per frame, after staging and before
//! emission.
//!
//! Tablets report distance and pressure from different sensors and the two
//! disagree around the contact threshold: hardware noise produces pressure
//! blips while hovering and residual distance while pressing. These rules
//! keep the emitted stream coherent. Their order is observable and pinned by
//! test: exclusion runs before gating, and both rules run.

use crate::axis::{Axis, AxisMask, AxisRegistry};

/// Prune the change set.
///
/// 1. Distance/pressure mutual exclusion: when both changed and both are
///    nonzero, distance is dropped - pressure means contact, and contact is
///    closer to ground truth than a hover estimate.
/// 2. Pressure gating: pressure changes without tip contact are sensor
///    noise and are dropped.
pub(crate) fn sanitize(changed: AxisMask, axes: &AxisRegistry, in_contact: bool) -> AxisMask {
    let mut changed = changed;

    let nonzero = |axis: Axis| {
        axes.descriptor_for(axis)
            .and_then(|desc| desc.last_value())
            .is_some_and(|value| value != 0)
    };

    if changed.contains(AxisMask::DISTANCE | AxisMask::PRESSURE)
        && nonzero(Axis::Distance)
        && nonzero(Axis::Pressure)
    {
        changed.remove(AxisMask::DISTANCE);
    }

    if changed.contains(AxisMask::PRESSURE) && !in_contact {
        changed.remove(AxisMask::PRESSURE);
    }

    changed
}
