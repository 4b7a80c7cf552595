// Wheelie tracker core
// Accelerometer samples in, tared tilt angle and wheelie/session statistics out

pub mod angle;
pub mod config;
pub mod error;
pub mod live_status;
pub mod sensors;
pub mod session;
pub mod smoothing;
pub mod storage;
pub mod tare;
pub mod tracker;
pub mod types;
pub mod wheelie;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use sensors::AccelSample;
pub use session::{HistoricalRecord, SessionAggregator, SessionStats};
pub use smoothing::{LowPassFilter, SmoothingProfile};
pub use storage::{HistoryStore, JsonFileStore, MemoryStore, MAX_HISTORY};
pub use tare::TareController;
pub use tracker::{TiltTracker, TrackerSnapshot};
pub use types::{GravityVec, MeasurementAxis, ScreenOrientation, WHEELIE_THRESHOLD_DEG};
pub use wheelie::{CompletedWheelie, WheelieDetector, WheelieEvent};
