use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::StorageError;
use crate::record::{TripRecord, TripSummary};

/// Receives completed trips from the session.
pub trait TripSink {
    fn save(&mut self, record: &TripRecord) -> Result<(), StorageError>;
}

/// Keeps records in memory, in save order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TripRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TripSink for MemorySink {
    fn save(&mut self, record: &TripRecord) -> Result<(), StorageError> {
        self.records.push(record.clone());
        Ok(())
    }
}

const INDEX_FILE: &str = "index.json";

/// One JSON file per trip plus an `index.json` history list.
///
/// Trips are keyed by their start timestamp.
pub struct JsonTripStore {
    dir: PathBuf,
}

impl JsonTripStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, start_time: i64) -> PathBuf {
        self.dir.join(format!("trip_{}.json", start_time))
    }

    /// History list, oldest first
    pub fn list(&self) -> Result<Vec<TripSummary>, StorageError> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn load(&self, start_time: i64) -> Result<TripRecord, StorageError> {
        let path = self.record_path(start_time);
        if !path.exists() {
            return Err(StorageError::NotFound(start_time));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn delete(&mut self, start_time: i64) -> Result<(), StorageError> {
        let path = self.record_path(start_time);
        if !path.exists() {
            return Err(StorageError::NotFound(start_time));
        }
        fs::remove_file(path)?;

        let mut index = self.list()?;
        index.retain(|s| s.start_time != start_time);
        self.write_index(&index)?;
        info!("Deleted trip {}", start_time);
        Ok(())
    }

    /// Writes the record's track as GPX next to its JSON file.
    pub fn export_gpx(&self, start_time: i64) -> Result<PathBuf, StorageError> {
        let record = self.load(start_time)?;
        let path = self.dir.join(format!("trip_{}.gpx", start_time));
        fs::write(&path, record.to_gpx())?;
        Ok(path)
    }

    fn write_index(&self, index: &[TripSummary]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.dir.join(INDEX_FILE), json)?;
        Ok(())
    }
}

impl TripSink for JsonTripStore {
    fn save(&mut self, record: &TripRecord) -> Result<(), StorageError> {
        let path = self.record_path(record.start_time);
        fs::write(&path, record.to_json()?)?;

        // Saving the same trip again replaces its history entry
        let mut index = self.list()?;
        index.retain(|s| s.start_time != record.start_time);
        index.push(record.summary());
        index.sort_by_key(|s| s.start_time);
        self.write_index(&index)?;

        debug!("Saved trip {} to {}", record.start_time, path.display());
        Ok(())
    }
}
