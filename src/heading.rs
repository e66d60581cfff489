use nalgebra::{Matrix3, Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Eight-point compass rose plus a catch-all for out-of-range bearings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    #[default]
    Unknown,
}

impl Direction {
    pub fn code(&self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
            Direction::Unknown => "--",
        }
    }

    /// Display label used by the Chinese UI
    pub fn label_zh(&self) -> &'static str {
        match self {
            Direction::N => "北",
            Direction::NE => "东北",
            Direction::E => "东",
            Direction::SE => "东南",
            Direction::S => "南",
            Direction::SW => "西南",
            Direction::W => "西",
            Direction::NW => "西北",
            Direction::Unknown => "--",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Euler angles in radians, as the platform's orientation call returns them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub azimuth: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Rotation matrix from a rotation-vector sample (x, y, z[, w, ...]).
///
/// When w is missing it is reconstructed from the unit-norm constraint,
/// clamped at zero. Returns `None` for truncated or degenerate samples.
pub fn rotation_matrix_from_vector(values: &[f64]) -> Option<Matrix3<f64>> {
    let (x, y, z) = match values {
        [x, y, z, ..] => (*x, *y, *z),
        _ => return None,
    };
    let w = match values.get(3) {
        Some(w) => *w,
        None => (1.0 - x * x - y * y - z * z).max(0.0).sqrt(),
    };

    let q = Quaternion::new(w, x, y, z);
    if !q.norm().is_normal() {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q).to_rotation_matrix().into_inner())
}

/// Azimuth, pitch and roll from a row-major device rotation matrix.
pub fn orientation_from_matrix(r: &Matrix3<f64>) -> Orientation {
    Orientation {
        azimuth: r[(0, 1)].atan2(r[(1, 1)]),
        pitch: (-r[(2, 1)]).clamp(-1.0, 1.0).asin(),
        roll: (-r[(2, 0)]).atan2(r[(2, 2)]),
    }
}

/// Maps the orientation azimuth to the bearing shown on screen.
///
/// This is a device calibration carried over unchanged, not the textbook
/// radians-to-degrees conversion.
pub fn attitude_to_bearing(azimuth: f64) -> f64 {
    if azimuth <= 0.0 {
        180.0 + (azimuth + 3.0) * 60.0
    } else {
        azimuth * 60.0
    }
}

/// Sector lookup on 45° sectors centred on the compass points.
///
/// Bearings outside roughly [-22.5, 382.5) fall outside the rose.
pub fn bearing_to_direction(bearing: f64) -> Direction {
    match ((bearing + 22.5) / 45.0) as i64 {
        0 => Direction::N,
        1 => Direction::NE,
        2 => Direction::E,
        3 => Direction::SE,
        4 => Direction::S,
        5 => Direction::SW,
        6 => Direction::W,
        7 => Direction::NW,
        8 => Direction::N,
        _ => Direction::Unknown,
    }
}

/// Same lookup after wrapping the bearing into [0, 360).
pub fn direction_for_bearing_normalized(bearing: f64) -> Direction {
    if !bearing.is_finite() {
        return Direction::Unknown;
    }
    bearing_to_direction(bearing.rem_euclid(360.0))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingState {
    pub bearing: f64,
    pub direction: Direction,
}

impl HeadingState {
    pub fn from_bearing(bearing: f64) -> Self {
        Self {
            bearing,
            direction: bearing_to_direction(bearing),
        }
    }
}

/// Full pipeline: rotation vector to bearing and direction.
pub fn resolve_heading(rotation_vector: &[f64]) -> Option<HeadingState> {
    let matrix = rotation_matrix_from_vector(rotation_vector)?;
    let orientation = orientation_from_matrix(&matrix);
    Some(HeadingState::from_bearing(attitude_to_bearing(orientation.azimuth)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_direction_sectors() {
        assert_eq!(bearing_to_direction(0.0), Direction::N);
        assert_eq!(bearing_to_direction(22.4), Direction::N);
        assert_eq!(bearing_to_direction(22.5), Direction::NE);
        assert_eq!(bearing_to_direction(90.0), Direction::E);
        assert_eq!(bearing_to_direction(135.0), Direction::SE);
        assert_eq!(bearing_to_direction(180.0), Direction::S);
        assert_eq!(bearing_to_direction(225.0), Direction::SW);
        assert_eq!(bearing_to_direction(270.0), Direction::W);
        assert_eq!(bearing_to_direction(315.0), Direction::NW);
        assert_eq!(bearing_to_direction(359.9), Direction::N);
        assert_eq!(bearing_to_direction(400.0), Direction::Unknown);
    }

    #[test]
    fn test_small_negative_bearing_truncates_toward_zero() {
        assert_eq!(bearing_to_direction(-30.0), Direction::N);
    }

    #[test]
    fn test_normalized_direction_is_periodic() {
        let mut b = -720.0;
        while b < 720.0 {
            assert_eq!(
                direction_for_bearing_normalized(b),
                direction_for_bearing_normalized(b + 360.0),
                "bearing {b}"
            );
            assert_ne!(direction_for_bearing_normalized(b), Direction::Unknown);
            b += 7.3;
        }
    }

    #[test]
    fn test_attitude_mapping_is_literal() {
        assert_relative_eq!(attitude_to_bearing(0.0), 360.0);
        assert_relative_eq!(attitude_to_bearing(-3.0), 180.0);
        assert_relative_eq!(attitude_to_bearing(-1.0), 300.0);
        assert_relative_eq!(attitude_to_bearing(1.5), 90.0);
    }

    #[test]
    fn test_identity_rotation_points_north() {
        let heading = resolve_heading(&[0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(heading.bearing, 360.0, epsilon = 1e-9);
        assert_eq!(heading.direction, Direction::N);
    }

    #[test]
    fn test_yaw_about_z() {
        // Rotating -90° about z gives an azimuth of +90° (π/2)
        let half = -FRAC_PI_2 / 2.0;
        let rv = [0.0, 0.0, half.sin(), half.cos()];
        let matrix = rotation_matrix_from_vector(&rv).unwrap();
        let orientation = orientation_from_matrix(&matrix);
        assert_relative_eq!(orientation.azimuth, FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(orientation.pitch, 0.0, epsilon = 1e-9);

        let heading = resolve_heading(&rv).unwrap();
        assert_relative_eq!(heading.bearing, FRAC_PI_2 * 60.0, epsilon = 1e-9);
        assert_eq!(heading.direction, Direction::E);
    }

    #[test]
    fn test_reconstructed_w_matches_explicit_w() {
        let (x, y, z) = (0.1, -0.2, 0.3);
        let w = (1.0_f64 - x * x - y * y - z * z).sqrt();
        let implicit = rotation_matrix_from_vector(&[x, y, z]).unwrap();
        let explicit = rotation_matrix_from_vector(&[x, y, z, w, 0.05]).unwrap();
        assert_relative_eq!(implicit, explicit, epsilon = 1e-12);
    }

    #[test]
    fn test_truncated_or_degenerate_sample_is_skipped() {
        assert!(resolve_heading(&[0.1, 0.2]).is_none());
        assert!(resolve_heading(&[0.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Direction::SW.code(), "SW");
        assert_eq!(Direction::E.label_zh(), "东");
        assert_eq!(Direction::Unknown.to_string(), "--");
    }
}
