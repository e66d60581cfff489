use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::sensors::SensorEvent;

/// Recorded event stream, replayable through a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<SensorEvent>,
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

impl EventLog {
    /// Reads `*.json` or gzip-compressed `*.json.gz`
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(serde_json::from_reader(BufReader::new(reader))?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let file = File::create(path)?;
        if is_gzip(path) {
            let mut gz = GzEncoder::new(BufWriter::new(file), Compression::default());
            serde_json::to_writer(&mut gz, self)?;
            gz.finish()?.flush()?;
        } else {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Events sorted by timestamp. Ties keep their recorded order.
    pub fn sorted(mut self) -> Self {
        self.events.sort_by_key(SensorEvent::timestamp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{LocationFix, SensorSample, TripCommand};
    use tempfile::TempDir;

    fn sample_log() -> EventLog {
        EventLog {
            events: vec![
                SensorEvent::Location(LocationFix::new(10.0, 10.0, 0)),
                SensorEvent::Command {
                    command: TripCommand::Start,
                    timestamp: 0,
                },
                SensorEvent::Sensor(SensorSample::acceleration(0.1, 0.0, 0.0, 500)),
            ],
        }
    }

    #[test]
    fn test_plain_and_gzip_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["log.json", "log.json.gz"] {
            let path = tmp.path().join(name);
            sample_log().save(&path).unwrap();
            assert_eq!(EventLog::load(&path).unwrap(), sample_log());
        }
    }

    #[test]
    fn test_sorted_is_stable() {
        let log = EventLog {
            events: vec![
                SensorEvent::Sensor(SensorSample::acceleration(0.0, 0.0, 0.0, 10)),
                SensorEvent::Location(LocationFix::new(10.0, 10.0, 0)),
                SensorEvent::Command {
                    command: TripCommand::Start,
                    timestamp: 0,
                },
            ],
        }
        .sorted();
        assert!(matches!(log.events[0], SensorEvent::Location(_)));
        assert!(matches!(log.events[1], SensorEvent::Command { .. }));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EventLog::load(Path::new("/nonexistent/log.json")),
            Err(StorageError::Io(_))
        ));
    }
}
