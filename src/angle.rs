//! Tilt angle from a gravity vector.
//!
//! Uses the full-range form `atan2(forward, -vertical)` so readings stay
//! continuous past vertical, which a ratio/asin inclinometer cannot do.
//! Output is always normalized into (-180°, 180°].
//!
//! [`half_range_angle`] is the older ±90° inclinometer reading. Nothing in
//! the tracking pipeline calls it.

use crate::types::{GravityVec, MeasurementAxis, ScreenOrientation, AXIS_X, AXIS_Y, AXIS_Z};

/// (forward component, vertical component) indices per axis × orientation
const COMPONENT_TABLE: [[(usize, usize); 2]; 2] = [
    // Pitch: portrait, landscape
    [(AXIS_Y, AXIS_Z), (AXIS_X, AXIS_Z)],
    // Roll: portrait, landscape
    [(AXIS_X, AXIS_Z), (AXIS_Y, AXIS_Z)],
];

/// Device components feeding the angle formula
pub fn components(axis: MeasurementAxis, orientation: ScreenOrientation) -> (usize, usize) {
    let row = match axis {
        MeasurementAxis::Pitch => 0,
        MeasurementAxis::Roll => 1,
    };
    let col = match orientation {
        ScreenOrientation::Portrait => 0,
        ScreenOrientation::Landscape => 1,
    };
    COMPONENT_TABLE[row][col]
}

/// Signed tilt in degrees for the selected axis and orientation
pub fn tilt_angle(
    filtered: &GravityVec,
    axis: MeasurementAxis,
    orientation: ScreenOrientation,
) -> f64 {
    let (forward, vertical) = components(axis, orientation);
    normalize_degrees(filtered[forward].atan2(-filtered[vertical]).to_degrees())
}

/// Gravity magnitude below which the half-range reading is undefined
pub const MIN_GRAVITY_MAGNITUDE: f64 = 0.1;

/// Legacy ±90° reading: `asin(forward / |g|)`.
///
/// Cannot tell 60° from 120°. Near-zero vectors read 0°.
pub fn half_range_angle(
    filtered: &GravityVec,
    axis: MeasurementAxis,
    orientation: ScreenOrientation,
) -> f64 {
    let magnitude = filtered.norm();
    if magnitude < MIN_GRAVITY_MAGNITUDE {
        return 0.0;
    }
    let (forward, _) = components(axis, orientation);
    let ratio = (filtered[forward] / magnitude).clamp(-1.0, 1.0);
    ratio.asin().to_degrees()
}

/// Wrap any finite angle into (-180, 180]
pub fn normalize_degrees(mut degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    if degrees.abs() > 720.0 {
        degrees %= 360.0;
    }
    while degrees <= -180.0 {
        degrees += 360.0;
    }
    while degrees > 180.0 {
        degrees -= 360.0;
    }
    degrees
}
