use thiserror::Error;

/// Wheelie tracker error types
///
/// The sensing pipeline itself never fails; these cover the edges around it
/// (configuration, history persistence, lifecycle misuse).
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker already running")]
    AlreadyRunning,

    #[error("Tracker not running")]
    NotRunning,

    #[error("No sensor reading since start")]
    NoReading,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
