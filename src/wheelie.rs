use crate::types::WHEELIE_THRESHOLD_DEG;
use serde::{Deserialize, Serialize};

/// A finished wheelie
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedWheelie {
    pub max_angle_deg: f64,
    pub duration_ms: i64,
    pub ended_at_ms: i64,
}

/// Detector output for one processed sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WheelieEvent {
    /// Crossed the threshold on this sample; `elapsed_ms` since the previous
    /// sample already counts toward the wheelie
    Started { angle_deg: f64, at_ms: i64, elapsed_ms: i64 },
    /// Still above threshold; `elapsed_ms` was added to the wheelie
    Continued { elapsed_ms: i64 },
    /// Dropped below threshold (or sensing stopped)
    Ended(CompletedWheelie),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    Idle,
    InWheelie,
}

/// Threshold state machine over the tared angle stream.
///
/// Every sample processed above threshold contributes the wall-clock time
/// since the previous sample, entry sample included. Sample count never
/// matters.
#[derive(Clone, Debug)]
pub struct WheelieDetector {
    threshold_deg: f64,
    state: DetectorState,
    current_max_deg: f64,
    current_duration_ms: i64,
    last_timestamp_ms: Option<i64>,
}

impl WheelieDetector {
    pub fn new() -> Self {
        Self::with_threshold(WHEELIE_THRESHOLD_DEG)
    }

    pub fn with_threshold(threshold_deg: f64) -> Self {
        Self {
            threshold_deg: threshold_deg.abs(),
            state: DetectorState::Idle,
            current_max_deg: 0.0,
            current_duration_ms: 0,
            last_timestamp_ms: None,
        }
    }

    /// Process one tared angle. `last_timestamp_ms` advances on every call.
    pub fn update(&mut self, angle_deg: f64, timestamp_ms: i64) -> Option<WheelieEvent> {
        let magnitude = angle_deg.abs();
        let elapsed_ms = self
            .last_timestamp_ms
            .map_or(0, |last| (timestamp_ms - last).max(0));
        self.last_timestamp_ms = Some(timestamp_ms);

        let above = magnitude >= self.threshold_deg;
        match (self.state, above) {
            (DetectorState::Idle, true) => {
                self.state = DetectorState::InWheelie;
                self.current_max_deg = magnitude;
                self.current_duration_ms = elapsed_ms;
                log::debug!("Wheelie started at {:.1}°", magnitude);
                Some(WheelieEvent::Started {
                    angle_deg: magnitude,
                    at_ms: timestamp_ms,
                    elapsed_ms,
                })
            }
            (DetectorState::Idle, false) => None,
            (DetectorState::InWheelie, true) => {
                self.current_duration_ms += elapsed_ms;
                self.current_max_deg = self.current_max_deg.max(magnitude);
                Some(WheelieEvent::Continued { elapsed_ms })
            }
            (DetectorState::InWheelie, false) => {
                Some(WheelieEvent::Ended(self.finish(timestamp_ms)))
            }
        }
    }

    /// Close an open wheelie as if the angle had dropped below threshold.
    pub fn force_exit(&mut self, timestamp_ms: i64) -> Option<CompletedWheelie> {
        match self.state {
            DetectorState::InWheelie => Some(self.finish(timestamp_ms)),
            DetectorState::Idle => None,
        }
    }

    /// Restart elapsed-time accounting from `now_ms` so a paused gap is not counted
    pub fn resume_at(&mut self, now_ms: i64) {
        self.last_timestamp_ms = Some(now_ms);
    }

    /// Drop any open wheelie without reporting it
    pub fn clear(&mut self) {
        self.state = DetectorState::Idle;
        self.current_max_deg = 0.0;
        self.current_duration_ms = 0;
    }

    fn finish(&mut self, timestamp_ms: i64) -> CompletedWheelie {
        let completed = CompletedWheelie {
            max_angle_deg: self.current_max_deg,
            duration_ms: self.current_duration_ms,
            ended_at_ms: timestamp_ms,
        };
        log::debug!(
            "Wheelie ended: max {:.1}°, {} ms",
            completed.max_angle_deg,
            completed.duration_ms
        );
        self.clear();
        completed
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn in_wheelie(&self) -> bool {
        self.state == DetectorState::InWheelie
    }

    pub fn current_max_deg(&self) -> f64 {
        self.current_max_deg
    }

    pub fn current_duration_ms(&self) -> i64 {
        self.current_duration_ms
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.last_timestamp_ms
    }

    pub fn threshold_deg(&self) -> f64 {
        self.threshold_deg
    }
}

impl Default for WheelieDetector {
    fn default() -> Self {
        Self::new()
    }
}
