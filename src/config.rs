use crate::error::{TrackerError, TrackerResult};
use crate::smoothing::SmoothingProfile;
use crate::storage::MAX_HISTORY;
use crate::types::{MeasurementAxis, ScreenOrientation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration, loadable from JSON. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub profile: SmoothingProfile,
    /// Overrides the profile's alpha when set
    pub alpha: Option<f64>,
    pub axis: MeasurementAxis,
    pub orientation: ScreenOrientation,
    pub history_path: PathBuf,
    pub history_cap: usize,
    /// Delay between start and the automatic tare
    pub tare_delay_ms: u64,
    pub status_interval_secs: u64,
    pub sample_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            profile: SmoothingProfile::default(),
            alpha: None,
            axis: MeasurementAxis::default(),
            orientation: ScreenOrientation::default(),
            history_path: PathBuf::from("wheelie_sessions/history.json"),
            history_cap: MAX_HISTORY,
            tare_delay_ms: 300,
            status_interval_secs: 2,
            sample_interval_ms: 20,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> TrackerResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective smoothing constant
    pub fn alpha(&self) -> f64 {
        self.alpha.unwrap_or_else(|| self.profile.alpha())
    }

    pub fn validate(&self) -> TrackerResult<()> {
        let alpha = self.alpha();
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(TrackerError::Config(format!(
                "alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        if self.history_cap == 0 {
            return Err(TrackerError::Config("history_cap must be at least 1".to_string()));
        }
        if self.sample_interval_ms == 0 {
            return Err(TrackerError::Config(
                "sample_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
