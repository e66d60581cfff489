use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::motion::{MotionThresholds, DEFAULT_ACCEL_THRESHOLD, DEFAULT_SPEED_THRESHOLD};

/// Tracker settings, read from a JSON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Linear acceleration magnitude below which the device may be stationary (m/s²)
    pub accel_threshold: f64,
    /// GNSS speed below which the device may be stationary (m/s)
    pub speed_threshold: f64,
    /// Bound of the event channel between the sensor source and the session
    pub channel_capacity: usize,
    /// Where completed trips are written
    pub output_dir: String,
    /// Start a trip on the first usable fix without waiting for a command
    pub auto_start: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accel_threshold: DEFAULT_ACCEL_THRESHOLD,
            speed_threshold: DEFAULT_SPEED_THRESHOLD,
            channel_capacity: 256,
            output_dir: "gnss_trips".to_string(),
            auto_start: false,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !(self.accel_threshold > 0.0) {
            return Err(TrackerError::Config(format!(
                "accel_threshold must be positive, got {}",
                self.accel_threshold
            )));
        }
        if !(self.speed_threshold > 0.0) {
            return Err(TrackerError::Config(format!(
                "speed_threshold must be positive, got {}",
                self.speed_threshold
            )));
        }
        if self.channel_capacity == 0 {
            return Err(TrackerError::Config("channel_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> MotionThresholds {
        MotionThresholds {
            accel: self.accel_threshold,
            speed: self.speed_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_classifier() {
        let config = TrackerConfig::default();
        assert_eq!(config.thresholds(), MotionThresholds::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"speed_threshold": 1.0, "auto_start": true}}"#).unwrap();

        let config = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(config.speed_threshold, 1.0);
        assert_eq!(config.accel_threshold, DEFAULT_ACCEL_THRESHOLD);
        assert!(config.auto_start);
        assert_eq!(config.channel_capacity, 256);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = TrackerConfig {
            accel_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        let config = TrackerConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = TrackerConfig::load("/nonexistent/gnss_trip.json");
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }
}
