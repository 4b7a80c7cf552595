use crate::types::GravityVec;
use serde::{Deserialize, Serialize};

/// Smoothing presets. Lower alpha = heavier smoothing, less jitter, more lag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingProfile {
    Smooth,
    #[default]
    Balanced,
    Responsive,
}

impl SmoothingProfile {
    pub fn alpha(self) -> f64 {
        match self {
            SmoothingProfile::Smooth => 0.05,
            SmoothingProfile::Balanced => 0.08,
            SmoothingProfile::Responsive => 0.15,
        }
    }
}

/// Per-axis exponential low-pass filter over raw accelerometer vectors
///
/// The first sample after construction or `reset` is taken as-is so the
/// output does not ramp up from zero.
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    alpha: f64,
    filtered: GravityVec,
    initialized: bool,
}

impl LowPassFilter {
    /// `alpha` is clamped into (0, 1].
    pub fn new(alpha: f64) -> Self {
        LowPassFilter {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            filtered: GravityVec::zeros(),
            initialized: false,
        }
    }

    pub fn with_profile(profile: SmoothingProfile) -> Self {
        Self::new(profile.alpha())
    }

    /// Feed one raw vector, returns the filtered vector
    pub fn update(&mut self, raw: GravityVec) -> GravityVec {
        if !self.initialized {
            self.filtered = raw;
            self.initialized = true;
        } else {
            self.filtered += (raw - self.filtered) * self.alpha;
        }
        self.filtered
    }

    pub fn reset(&mut self) {
        self.filtered = GravityVec::zeros();
        self.initialized = false;
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last filtered vector (zero until the first sample)
    pub fn current(&self) -> GravityVec {
        self.filtered
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::with_profile(SmoothingProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_sample_snaps() {
        let mut filter = LowPassFilter::new(0.08);
        let raw = GravityVec::new(1.5, -2.0, 9.7);
        let out = filter.update(raw);
        assert_eq!(out, raw);
        assert!(filter.is_initialized());
    }

    #[test]
    fn test_second_sample_blends() {
        let mut filter = LowPassFilter::new(0.1);
        filter.update(GravityVec::new(0.0, 0.0, 0.0));
        let out = filter.update(GravityVec::new(10.0, -10.0, 5.0));
        assert_abs_diff_eq!(out.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_converges_to_constant_input() {
        let alpha = 0.08;
        let mut filter = LowPassFilter::new(alpha);
        filter.update(GravityVec::zeros());
        let target = GravityVec::new(0.0, 9.81, 0.0);

        // (1 - alpha)^n shrinks the error; 10/alpha steps is far past 1e-3
        let steps = (10.0 / alpha) as usize;
        let mut out = GravityVec::zeros();
        for _ in 0..steps {
            out = filter.update(target);
        }
        assert!((out - target).norm() < 1e-3);
    }

    #[test]
    fn test_reset_snaps_again() {
        let mut filter = LowPassFilter::new(0.05);
        filter.update(GravityVec::new(1.0, 1.0, 1.0));
        filter.update(GravityVec::new(2.0, 2.0, 2.0));
        filter.reset();
        assert!(!filter.is_initialized());
        let raw = GravityVec::new(-3.0, 0.0, 9.0);
        assert_eq!(filter.update(raw), raw);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(SmoothingProfile::default().alpha(), 0.08);
        assert!(SmoothingProfile::Smooth.alpha() < SmoothingProfile::Responsive.alpha());
        assert_eq!(LowPassFilter::new(5.0).alpha(), 1.0);
    }
}
