//! Top-level tilt tracking context.
//!
//! Owns the whole pipeline (filter → angle → tare → detector → session) plus
//! the history store, and hands out immutable snapshots after every sample
//! or action. Strictly synchronous: callers serialize samples and commands.

use crate::angle::tilt_angle;
use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::sensors::AccelSample;
use crate::session::{HistoricalRecord, SessionAggregator};
use crate::smoothing::LowPassFilter;
use crate::storage::{HistoryStore, MemoryStore};
use crate::tare::TareController;
use crate::types::{MeasurementAxis, ScreenOrientation};
use crate::wheelie::{CompletedWheelie, WheelieDetector, WheelieEvent};
use serde::{Deserialize, Serialize};

/// Read-only view of tracker state for presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Tared angle in (-180, 180]
    pub angle_deg: f64,
    pub raw_angle_deg: f64,
    pub is_running: bool,
    pub is_tared: bool,
    pub tare_offset_deg: f64,
    pub axis: MeasurementAxis,
    pub orientation: ScreenOrientation,
    pub in_wheelie: bool,
    pub current_wheelie_max_deg: f64,
    pub current_wheelie_duration_ms: i64,
    pub session_max_angle_deg: f64,
    pub wheelie_count: u32,
    pub session_total_duration_ms: i64,
    pub last_wheelie: Option<CompletedWheelie>,
    pub samples_processed: u64,
}

pub struct TiltTracker<S: HistoryStore = MemoryStore> {
    filter: LowPassFilter,
    axis: MeasurementAxis,
    orientation: ScreenOrientation,
    tare: TareController,
    detector: WheelieDetector,
    session: SessionAggregator,
    store: S,
    history: Vec<HistoricalRecord>,
    history_cap: usize,
    running: bool,
    raw_angle: f64,
    angle: f64,
    samples_processed: u64,
}

impl TiltTracker<MemoryStore> {
    /// Tracker with default config and in-memory history
    pub fn in_memory() -> Self {
        let config = TrackerConfig::default();
        let store = MemoryStore::with_cap(config.history_cap);
        Self::new(&config, store)
    }
}

impl<S: HistoryStore> TiltTracker<S> {
    pub fn new(config: &TrackerConfig, store: S) -> Self {
        let history = store.load();
        TiltTracker {
            filter: LowPassFilter::new(config.alpha()),
            axis: config.axis,
            orientation: config.orientation,
            tare: TareController::new(),
            detector: WheelieDetector::new(),
            session: SessionAggregator::new(),
            store,
            history,
            history_cap: config.history_cap.max(1),
            running: false,
            raw_angle: 0.0,
            angle: 0.0,
            samples_processed: 0,
        }
    }

    /// Begin accepting samples. Elapsed-time accounting restarts at `now_ms`.
    pub fn start(&mut self, now_ms: i64) -> TrackerResult<()> {
        if self.running {
            return Err(TrackerError::AlreadyRunning);
        }
        self.filter.reset();
        self.detector.resume_at(now_ms);
        self.running = true;
        log::info!("Tracking started ({} / {})", self.axis, self.orientation);
        Ok(())
    }

    /// Stop accepting samples. An open wheelie is closed and counted first.
    pub fn stop(&mut self, now_ms: i64) -> TrackerResult<Option<CompletedWheelie>> {
        if !self.running {
            return Err(TrackerError::NotRunning);
        }
        let closed = self.detector.force_exit(now_ms);
        if let Some(wheelie) = closed {
            self.session.on_wheelie_end(wheelie);
        }
        self.running = false;
        self.filter.reset();
        self.raw_angle = 0.0;
        self.angle = 0.0;
        log::info!(
            "Tracking stopped after {} samples ({} wheelies this session)",
            self.samples_processed,
            self.session.stats().wheelie_count
        );
        Ok(closed)
    }

    /// Run one sample through the pipeline. Ignored while stopped.
    pub fn process_sample(&mut self, sample: &AccelSample) -> TrackerSnapshot {
        if !self.running {
            return self.snapshot();
        }

        let filtered = self.filter.update(sample.vector());
        self.raw_angle = tilt_angle(&filtered, self.axis, self.orientation);
        self.angle = self.tare.apply(self.raw_angle);
        self.session.record_sample(self.angle);

        match self.detector.update(self.angle, sample.timestamp_ms) {
            Some(WheelieEvent::Started { elapsed_ms, .. }) => {
                self.session.on_wheelie_start(elapsed_ms)
            }
            Some(WheelieEvent::Continued { elapsed_ms }) => {
                self.session.on_wheelie_progress(elapsed_ms)
            }
            Some(WheelieEvent::Ended(wheelie)) => self.session.on_wheelie_end(wheelie),
            None => {}
        }

        self.samples_processed += 1;
        self.snapshot()
    }

    /// Zero the reading at the current untared angle.
    /// Needs at least one sample since `start`.
    pub fn tare(&mut self) -> TrackerResult<()> {
        if !self.running {
            return Err(TrackerError::NotRunning);
        }
        if !self.filter.is_initialized() {
            return Err(TrackerError::NoReading);
        }
        self.tare.tare(self.raw_angle);
        self.angle = self.tare.apply(self.raw_angle);
        log::info!("Tared at {:.1}°", self.raw_angle);
        Ok(())
    }

    pub fn reset_tare(&mut self) {
        self.tare.reset();
        self.angle = self.tare.apply(self.raw_angle);
    }

    /// Switching axis drops the tare, which was captured on the old axis
    pub fn set_axis(&mut self, axis: MeasurementAxis) {
        if axis == self.axis {
            return;
        }
        self.axis = axis;
        self.tare.reset();
        self.refresh_angle();
        log::info!("Measuring {}", axis);
    }

    pub fn set_orientation(&mut self, orientation: ScreenOrientation) {
        if orientation == self.orientation {
            return;
        }
        self.orientation = orientation;
        self.refresh_angle();
        log::info!("Orientation {}", orientation);
    }

    /// Close the current session. A qualifying one is saved and returned.
    /// Tare is untouched.
    pub fn new_session(&mut self, now_ms: i64) -> Option<HistoricalRecord> {
        self.detector.clear();
        let record = self.session.reset(now_ms)?;
        self.persist(record);
        Some(record)
    }

    /// Host is going away: stop if running and flush the session
    pub fn suspend(&mut self, now_ms: i64) -> Option<HistoricalRecord> {
        if !self.running {
            return None;
        }
        if let Err(e) = self.stop(now_ms) {
            log::warn!("Suspend: {}", e);
        }
        self.new_session(now_ms)
    }

    pub fn clear_history(&mut self) -> TrackerResult<()> {
        self.store.clear()?;
        self.history.clear();
        log::info!("History cleared");
        Ok(())
    }

    /// Saved sessions, oldest first
    pub fn history(&self) -> &[HistoricalRecord] {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn axis(&self) -> MeasurementAxis {
        self.axis
    }

    pub fn orientation(&self) -> ScreenOrientation {
        self.orientation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let stats = self.session.stats();
        TrackerSnapshot {
            angle_deg: self.angle,
            raw_angle_deg: self.raw_angle,
            is_running: self.running,
            is_tared: self.tare.is_tared(),
            tare_offset_deg: self.tare.offset_degrees(),
            axis: self.axis,
            orientation: self.orientation,
            in_wheelie: self.detector.in_wheelie(),
            current_wheelie_max_deg: self.detector.current_max_deg(),
            current_wheelie_duration_ms: self.detector.current_duration_ms(),
            session_max_angle_deg: stats.max_angle_deg,
            wheelie_count: stats.wheelie_count,
            session_total_duration_ms: stats.total_wheelie_duration_ms,
            last_wheelie: self.session.last_wheelie(),
            samples_processed: self.samples_processed,
        }
    }

    fn refresh_angle(&mut self) {
        if self.running && self.filter.is_initialized() {
            self.raw_angle = tilt_angle(&self.filter.current(), self.axis, self.orientation);
        }
        self.angle = self.tare.apply(self.raw_angle);
    }

    fn persist(&mut self, record: HistoricalRecord) {
        match self.store.append(record) {
            Ok(()) => self.history = self.store.load(),
            Err(e) => {
                log::warn!("Failed to save session, keeping it in memory only: {}", e);
                self.history.push(record);
                if self.history.len() > self.history_cap {
                    let excess = self.history.len() - self.history_cap;
                    self.history.drain(..excess);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const G: f64 = 9.81;

    fn pitch_sample(deg: f64, timestamp_ms: i64) -> AccelSample {
        let r = deg.to_radians();
        AccelSample::new(0.0, G * r.sin(), -G * r.cos(), timestamp_ms)
    }

    fn unsmoothed() -> TiltTracker {
        let config = TrackerConfig {
            alpha: Some(1.0),
            ..Default::default()
        };
        TiltTracker::new(&config, MemoryStore::new())
    }

    #[test]
    fn test_samples_ignored_while_stopped() {
        let mut tracker = unsmoothed();
        let snap = tracker.process_sample(&pitch_sample(30.0, 0));
        assert_eq!(snap.samples_processed, 0);
        assert_eq!(snap.angle_deg, 0.0);
        assert!(!snap.is_running);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut tracker = unsmoothed();
        assert!(matches!(tracker.stop(0), Err(TrackerError::NotRunning)));
        assert!(matches!(tracker.tare(), Err(TrackerError::NotRunning)));
        tracker.start(0).unwrap();
        assert!(matches!(tracker.start(0), Err(TrackerError::AlreadyRunning)));
    }

    #[test]
    fn test_wheelie_flows_into_session() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        for (i, deg) in [0.0, 20.0, 25.0, 10.0].iter().enumerate() {
            tracker.process_sample(&pitch_sample(*deg, (i as i64 + 1) * 100));
        }
        let snap = tracker.snapshot();
        assert_eq!(snap.wheelie_count, 1);
        assert_eq!(snap.session_total_duration_ms, 200);
        assert_abs_diff_eq!(snap.session_max_angle_deg, 25.0, epsilon = 1e-9);
        let last = snap.last_wheelie.unwrap();
        assert_abs_diff_eq!(last.max_angle_deg, 25.0, epsilon = 1e-9);
        assert_eq!(last.duration_ms, 200);
        assert!(!snap.in_wheelie);
    }

    struct FailingStore;

    impl HistoryStore for FailingStore {
        fn load(&self) -> Vec<HistoricalRecord> {
            Vec::new()
        }

        fn append(&mut self, _record: HistoricalRecord) -> TrackerResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn clear(&mut self) -> TrackerResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tare_needs_a_reading_since_start() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        assert!(matches!(tracker.tare(), Err(TrackerError::NoReading)));

        let snap = tracker.process_sample(&pitch_sample(30.0, 20));
        assert!(!snap.is_tared);
        assert_eq!(snap.tare_offset_deg, 0.0);
        assert_abs_diff_eq!(snap.angle_deg, 30.0, epsilon = 1e-9);

        tracker.tare().unwrap();
        assert_abs_diff_eq!(tracker.snapshot().tare_offset_deg, 30.0, epsilon = 1e-9);

        // a restart needs a fresh reading again
        tracker.stop(40).unwrap();
        tracker.start(60).unwrap();
        assert!(matches!(tracker.tare(), Err(TrackerError::NoReading)));
        assert!(tracker.snapshot().is_tared);
    }

    #[test]
    fn test_failed_save_keeps_capped_history_in_memory() {
        let config = TrackerConfig {
            alpha: Some(1.0),
            history_cap: 3,
            ..Default::default()
        };
        let mut tracker = TiltTracker::new(&config, FailingStore);
        tracker.start(0).unwrap();
        for i in 0..5 {
            tracker.process_sample(&pitch_sample(20.0 + i as f64, 20 * (i + 1)));
            assert!(tracker.new_session(1_000 + i).is_some());
        }
        let stamps: Vec<i64> = tracker.history().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![1_002, 1_003, 1_004]);
    }

    #[test]
    fn test_tare_zeroes_and_axis_change_clears_it() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(8.0, 20));
        tracker.tare().unwrap();
        let snap = tracker.snapshot();
        assert!(snap.is_tared);
        assert_abs_diff_eq!(snap.angle_deg, 0.0, epsilon = 1e-9);

        // same axis is a no-op
        tracker.set_axis(MeasurementAxis::Pitch);
        assert!(tracker.snapshot().is_tared);

        tracker.set_axis(MeasurementAxis::Roll);
        let snap = tracker.snapshot();
        assert!(!snap.is_tared);
        assert_eq!(snap.tare_offset_deg, 0.0);
    }

    #[test]
    fn test_tare_does_not_touch_detector() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(30.0, 20));
        tracker.tare().unwrap();
        let snap = tracker.snapshot();
        assert!(snap.in_wheelie);
        assert_eq!(snap.wheelie_count, 0);

        // next sample reads ~0° after tare and ends the wheelie normally
        let snap = tracker.process_sample(&pitch_sample(30.0, 40));
        assert!(!snap.in_wheelie);
        assert_eq!(snap.wheelie_count, 1);
    }

    #[test]
    fn test_stop_in_wheelie_closes_exactly_once() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(40.0, 20));
        tracker.process_sample(&pitch_sample(50.0, 40));

        let closed = tracker.stop(60).unwrap().unwrap();
        assert_abs_diff_eq!(closed.max_angle_deg, 50.0, epsilon = 1e-9);

        let snap = tracker.snapshot();
        assert_eq!(snap.wheelie_count, 1);
        assert!(!snap.in_wheelie);
        assert_eq!(snap.angle_deg, 0.0);
        assert!(!snap.is_running);
    }

    #[test]
    fn test_restart_does_not_count_paused_gap() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(30.0, 100));
        tracker.stop(120).unwrap();

        tracker.start(90_000).unwrap();
        tracker.process_sample(&pitch_sample(30.0, 90_020));
        tracker.process_sample(&pitch_sample(30.0, 90_040));
        let snap = tracker.snapshot();
        assert_eq!(snap.current_wheelie_duration_ms, 40);
        assert!(snap.session_total_duration_ms < 1_000);
    }

    #[test]
    fn test_new_session_persists_qualifying_only() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(10.0, 20));
        assert!(tracker.new_session(1_000).is_none());
        assert!(tracker.history().is_empty());

        tracker.process_sample(&pitch_sample(20.0, 40));
        tracker.process_sample(&pitch_sample(22.0, 60));
        tracker.tare().unwrap();
        let record = tracker.new_session(2_000).unwrap();
        assert_eq!(record.timestamp, 2_000);
        assert_eq!(record.wheelie_count, 0);
        assert!(record.max_angle_deg > 15.0);
        assert_eq!(tracker.history(), &[record]);

        let snap = tracker.snapshot();
        assert_eq!(snap.wheelie_count, 0);
        assert_eq!(snap.session_max_angle_deg, 0.0);
        assert!(!snap.in_wheelie);
        // tare survives a new session
        assert!(snap.is_tared);
    }

    #[test]
    fn test_suspend_flushes_once() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&pitch_sample(35.0, 20));
        tracker.process_sample(&pitch_sample(35.0, 520));

        let record = tracker.suspend(600).unwrap();
        assert_eq!(record.wheelie_count, 1);
        assert_eq!(record.total_duration_ms, 520);
        assert!(!tracker.is_running());
        assert!(tracker.suspend(700).is_none());
        assert_eq!(tracker.history().len(), 1);

        tracker.clear_history().unwrap();
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_orientation_change_remaps() {
        let mut tracker = unsmoothed();
        tracker.start(0).unwrap();
        tracker.process_sample(&AccelSample::new(G * 0.5, 0.0, -G * 0.75_f64.sqrt(), 20));
        assert_abs_diff_eq!(tracker.snapshot().angle_deg, 0.0, epsilon = 1e-9);

        tracker.set_orientation(ScreenOrientation::Landscape);
        assert_abs_diff_eq!(tracker.snapshot().angle_deg, 30.0, epsilon = 1e-9);
    }
}
