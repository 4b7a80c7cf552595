use crate::error::TrackerResult;
use crate::session::HistoricalRecord;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Most recent sessions kept in history
pub const MAX_HISTORY: usize = 50;

/// Ordered (oldest first), capped history of finished sessions
pub trait HistoryStore {
    /// Stored records, oldest first. Unreadable data reads as empty.
    fn load(&self) -> Vec<HistoricalRecord>;

    /// Append one record, dropping the oldest beyond the cap
    fn append(&mut self, record: HistoricalRecord) -> TrackerResult<()>;

    fn clear(&mut self) -> TrackerResult<()>;
}

/// Keep only the `cap` most recent records
fn retain_latest(records: &mut Vec<HistoricalRecord>, cap: usize) {
    if records.len() > cap {
        let excess = records.len() - cap;
        records.drain(..excess);
    }
}

/// Volatile history, for tests and replays
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: VecDeque<HistoricalRecord>,
    cap: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_cap(MAX_HISTORY)
    }

    pub fn with_cap(cap: usize) -> Self {
        MemoryStore {
            records: VecDeque::with_capacity(cap.min(MAX_HISTORY)),
            cap: cap.max(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Vec<HistoricalRecord> {
        self.records.iter().copied().collect()
    }

    fn append(&mut self, record: HistoricalRecord) -> TrackerResult<()> {
        self.records.push_back(record);
        while self.records.len() > self.cap {
            self.records.pop_front();
        }
        Ok(())
    }

    fn clear(&mut self) -> TrackerResult<()> {
        self.records.clear();
        Ok(())
    }
}

/// History persisted as a JSON array of records
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    cap: usize,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cap(path, MAX_HISTORY)
    }

    pub fn with_cap(path: impl Into<PathBuf>, cap: usize) -> Self {
        JsonFileStore {
            path: path.into(),
            cap: cap.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> TrackerResult<Vec<HistoricalRecord>> {
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_records(&self, records: &[HistoricalRecord]) -> TrackerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Vec<HistoricalRecord> {
        if !self.path.exists() {
            return Vec::new();
        }
        match self.read_records() {
            Ok(mut records) => {
                retain_latest(&mut records, self.cap);
                records
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable history at {}: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn append(&mut self, record: HistoricalRecord) -> TrackerResult<()> {
        let mut records = self.load();
        records.push(record);
        retain_latest(&mut records, self.cap);
        self.write_records(&records)?;
        log::info!(
            "Saved session to {} ({} in history)",
            self.path.display(),
            records.len()
        );
        Ok(())
    }

    fn clear(&mut self) -> TrackerResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
