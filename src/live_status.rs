use crate::session::format_duration_ms;
use crate::tracker::TrackerSnapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Periodic status dump for whatever UI is watching the output directory
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub uptime_seconds: u64,
    pub samples_received: u64,
    pub history_len: usize,
    pub session_duration_text: String,
    #[serde(flatten)]
    pub snapshot: TrackerSnapshot,
}

impl LiveStatus {
    pub fn new(
        snapshot: TrackerSnapshot,
        samples_received: u64,
        uptime_seconds: u64,
        history_len: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            uptime_seconds,
            samples_received,
            history_len,
            session_duration_text: format_duration_ms(snapshot.session_total_duration_ms),
            snapshot,
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TiltTracker;

    #[test]
    fn test_status_flattens_snapshot() {
        let tracker = TiltTracker::in_memory();
        let status = LiveStatus::new(tracker.snapshot(), 12, 3, 0);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["samples_received"], 12);
        assert_eq!(json["wheelie_count"], 0);
        assert_eq!(json["axis"], "pitch");
        assert_eq!(json["session_duration_text"], "0s");
    }

    #[test]
    fn test_save_writes_json() {
        let path = std::env::temp_dir().join(format!("wheelie_status_{}.json", std::process::id()));
        let status = LiveStatus::new(TiltTracker::in_memory().snapshot(), 0, 0, 0);
        status.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let back: LiveStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(back.snapshot, status.snapshot);
        fs::remove_file(&path).unwrap();
    }
}
