pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// Fixed wheelie threshold in degrees, shared by detection and session qualification
pub const WHEELIE_THRESHOLD_DEG: f64 = 15.0;

/// Which logical tilt is measured
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementAxis {
    /// Forward/back tilt (wheelies)
    #[default]
    Pitch,
    /// Left/right tilt (lean angle)
    Roll,
}

/// How the device is held
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl std::fmt::Display for MeasurementAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementAxis::Pitch => write!(f, "pitch"),
            MeasurementAxis::Roll => write!(f, "roll"),
        }
    }
}

impl std::fmt::Display for ScreenOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenOrientation::Portrait => write!(f, "portrait"),
            ScreenOrientation::Landscape => write!(f, "landscape"),
        }
    }
}
