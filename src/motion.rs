use serde::{Deserialize, Serialize};

use crate::sensors::LocationFix;

/// Below this linear acceleration magnitude the device may be stationary (m/s²)
pub const DEFAULT_ACCEL_THRESHOLD: f64 = 0.2;
/// Below this GNSS ground speed the device may be stationary (m/s)
pub const DEFAULT_SPEED_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionThresholds {
    pub accel: f64,
    pub speed: f64,
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            accel: DEFAULT_ACCEL_THRESHOLD,
            speed: DEFAULT_SPEED_THRESHOLD,
        }
    }
}

/// Zero-velocity detection.
///
/// Stationary means both the linear acceleration magnitude and the last GNSS
/// speed sit strictly below their thresholds. With no fix the speed reads as 0,
/// so an unlocated device is judged on acceleration alone.
pub fn classify(
    last_fix: Option<&LocationFix>,
    accel: [f64; 3],
    thresholds: &MotionThresholds,
) -> bool {
    let [x, y, z] = accel;
    let accel_magnitude = (x * x + y * y + z * z).sqrt();
    let gnss_speed = last_fix.map(LocationFix::speed_or_zero).unwrap_or(0.0);

    accel_magnitude < thresholds.accel && gnss_speed < thresholds.speed
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub stationary: bool,
    pub accel_magnitude: f64,
}

/// Holds the latest classification so the session can read it between samples.
pub struct MotionClassifier {
    thresholds: MotionThresholds,
    state: MotionState,
}

impl MotionClassifier {
    pub fn new(thresholds: MotionThresholds) -> Self {
        Self {
            thresholds,
            state: MotionState::default(),
        }
    }

    pub fn update(&mut self, last_fix: Option<&LocationFix>, accel: [f64; 3]) -> MotionState {
        let [x, y, z] = accel;
        self.state = MotionState {
            stationary: classify(last_fix, accel, &self.thresholds),
            accel_magnitude: (x * x + y * y + z * z).sqrt(),
        };
        self.state
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_stationary(&self) -> bool {
        self.state.stationary
    }

    pub fn thresholds(&self) -> &MotionThresholds {
        &self.thresholds
    }
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(MotionThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_with_speed(speed: f64) -> LocationFix {
        LocationFix::new(10.0, 10.0, 0).with_speed(speed)
    }

    #[test]
    fn test_still_device_is_stationary() {
        let t = MotionThresholds::default();
        let fix = fix_with_speed(0.1);
        assert!(classify(Some(&fix), [0.05, 0.05, 0.05], &t));
    }

    #[test]
    fn test_thresholds_are_strict() {
        let t = MotionThresholds::default();

        // Magnitude exactly at 0.2
        let fix = fix_with_speed(0.0);
        assert!(!classify(Some(&fix), [0.2, 0.0, 0.0], &t));

        // Speed exactly at 0.5
        let fix = fix_with_speed(0.5);
        assert!(!classify(Some(&fix), [0.0, 0.0, 0.0], &t));
    }

    #[test]
    fn test_grid_below_and_above() {
        let t = MotionThresholds::default();
        for accel in [0.0, 0.05, 0.1, 0.19] {
            for speed in [0.0, 0.2, 0.49] {
                let fix = fix_with_speed(speed);
                assert!(classify(Some(&fix), [accel, 0.0, 0.0], &t), "a={accel} v={speed}");
            }
        }
        for accel in [0.2, 0.5, 3.0] {
            let fix = fix_with_speed(0.0);
            assert!(!classify(Some(&fix), [0.0, accel, 0.0], &t));
        }
        for speed in [0.5, 1.0, 30.0] {
            let fix = fix_with_speed(speed);
            assert!(!classify(Some(&fix), [0.0, 0.0, 0.0], &t));
        }
    }

    #[test]
    fn test_missing_fix_or_speed_reads_as_zero() {
        let t = MotionThresholds::default();
        assert!(classify(None, [0.1, 0.0, 0.0], &t));

        let no_speed = LocationFix::new(10.0, 10.0, 0);
        assert!(classify(Some(&no_speed), [0.1, 0.0, 0.0], &t));
    }

    #[test]
    fn test_classifier_keeps_latest_state() {
        let mut classifier = MotionClassifier::default();
        let fix = fix_with_speed(0.0);

        let state = classifier.update(Some(&fix), [3.0, 4.0, 0.0]);
        assert!(!state.stationary);
        assert_eq!(state.accel_magnitude, 5.0);

        classifier.update(Some(&fix), [0.0, 0.0, 0.0]);
        assert!(classifier.is_stationary());
    }

    #[test]
    fn test_custom_thresholds() {
        let t = MotionThresholds { accel: 1.0, speed: 2.0 };
        let fix = fix_with_speed(1.5);
        assert!(classify(Some(&fix), [0.5, 0.0, 0.0], &t));
    }
}
