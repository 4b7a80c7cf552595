use crate::angle::normalize_degrees;
use serde::{Deserialize, Serialize};

/// Zero-offset for the tilt reading.
///
/// The offset is always captured from the untared angle, so taring twice
/// never compounds. Offsets are only meaningful for the axis they were
/// captured on; callers reset on axis change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TareController {
    offset_degrees: f64,
    is_tared: bool,
}

impl TareController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `raw_angle` (untared) as the new zero
    pub fn tare(&mut self, raw_angle: f64) {
        self.offset_degrees = raw_angle;
        self.is_tared = true;
    }

    pub fn reset(&mut self) {
        self.offset_degrees = 0.0;
        self.is_tared = false;
    }

    /// Tared angle, wrapped back into (-180, 180]
    pub fn apply(&self, raw_angle: f64) -> f64 {
        normalize_degrees(raw_angle - self.offset_degrees)
    }

    pub fn offset_degrees(&self) -> f64 {
        self.offset_degrees
    }

    pub fn is_tared(&self) -> bool {
        self.is_tared
    }
}
