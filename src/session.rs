use crate::types::WHEELIE_THRESHOLD_DEG;
use crate::wheelie::CompletedWheelie;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Persisted summary of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Epoch milliseconds at which the session was closed
    pub timestamp: i64,
    #[serde(rename = "maxAngle")]
    pub max_angle_deg: f64,
    #[serde(rename = "wheelieCount")]
    pub wheelie_count: u32,
    #[serde(rename = "totalDurationMs")]
    pub total_duration_ms: i64,
}

impl HistoricalRecord {
    /// e.g. "Mar 4, 17:05" in local time
    pub fn formatted_date(&self) -> String {
        Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|dt| dt.format("%b %-d, %H:%M").to_string())
            .unwrap_or_default()
    }

    /// "1m 5s" or "42s"
    pub fn formatted_duration(&self) -> String {
        format_duration_ms(self.total_duration_ms)
    }
}

pub fn format_duration_ms(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;
    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, remaining_seconds)
    } else {
        format!("{}s", remaining_seconds)
    }
}

/// Session-level totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub max_angle_deg: f64,
    pub wheelie_count: u32,
    pub total_wheelie_duration_ms: i64,
}

/// Rolls detector output up into per-session maxima, counts and totals
#[derive(Debug, Clone, Default)]
pub struct SessionAggregator {
    stats: SessionStats,
    wheelie_open: bool,
    last_wheelie: Option<CompletedWheelie>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every processed angle feeds the session max, threshold or not
    pub fn record_sample(&mut self, angle_deg: f64) {
        let magnitude = angle_deg.abs();
        if magnitude > self.stats.max_angle_deg {
            self.stats.max_angle_deg = magnitude;
        }
    }

    pub fn on_wheelie_start(&mut self, elapsed_ms: i64) {
        self.wheelie_open = true;
        self.on_wheelie_progress(elapsed_ms);
    }

    /// Time spent in the open wheelie counts toward the session as it happens
    pub fn on_wheelie_progress(&mut self, elapsed_ms: i64) {
        if self.wheelie_open {
            self.stats.total_wheelie_duration_ms += elapsed_ms.max(0);
        }
    }

    /// Duration already arrived through progress updates; only the count moves here.
    pub fn on_wheelie_end(&mut self, wheelie: CompletedWheelie) {
        self.wheelie_open = false;
        self.stats.wheelie_count += 1;
        self.last_wheelie = Some(wheelie);
    }

    /// A session is worth keeping if anything crossed the threshold
    pub fn qualifies(&self) -> bool {
        self.stats.wheelie_count > 0 || self.stats.max_angle_deg > WHEELIE_THRESHOLD_DEG
    }

    /// Close the session: a qualifying one becomes a record stamped `now_ms`.
    /// All counters are zeroed either way.
    pub fn reset(&mut self, now_ms: i64) -> Option<HistoricalRecord> {
        let record = self.qualifies().then(|| HistoricalRecord {
            timestamp: now_ms,
            max_angle_deg: self.stats.max_angle_deg,
            wheelie_count: self.stats.wheelie_count,
            total_duration_ms: self.stats.total_wheelie_duration_ms,
        });
        *self = Self::default();
        record
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn wheelie_open(&self) -> bool {
        self.wheelie_open
    }

    pub fn last_wheelie(&self) -> Option<CompletedWheelie> {
        self.last_wheelie
    }
}
