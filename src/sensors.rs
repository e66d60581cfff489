use serde::{Deserialize, Serialize};

/// Latitude the platform layer reports when it has never obtained a fix.
pub const UNLOCATED_LATITUDE: f64 = 200.0;

/// One location report from the positioning subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    /// Ground speed in m/s, absent when the provider did not report one
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub bearing: f64,
    #[serde(default)]
    pub accuracy: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "gps".to_string()
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            speed: None,
            bearing: 0.0,
            accuracy: 0.0,
            timestamp,
            provider: default_provider(),
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    /// True for the "never located" placeholder the platform hands out before a real fix.
    pub fn is_unlocated(&self) -> bool {
        self.latitude == UNLOCATED_LATITUDE
    }

    /// Speed with the "no speed" case read as standing still.
    pub fn speed_or_zero(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }

    /// Converts a raw platform fix into the optional form the core works with.
    pub fn located(self) -> Option<Self> {
        if self.is_unlocated() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    LinearAcceleration,
    RotationVector,
}

/// Raw sensor vector as delivered by the platform.
///
/// Linear acceleration carries three axes in m/s². The rotation vector carries
/// x, y, z and optionally the scalar w and a heading-accuracy estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub kind: SensorKind,
    pub values: Vec<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl SensorSample {
    pub fn acceleration(x: f64, y: f64, z: f64, timestamp: i64) -> Self {
        Self {
            kind: SensorKind::LinearAcceleration,
            values: vec![x, y, z],
            timestamp,
        }
    }

    pub fn rotation(values: &[f64], timestamp: i64) -> Self {
        Self {
            kind: SensorKind::RotationVector,
            values: values.to_vec(),
            timestamp,
        }
    }

    /// First three components, or `None` when the sample is truncated.
    pub fn xyz(&self) -> Option<[f64; 3]> {
        match self.values.as_slice() {
            [x, y, z, ..] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    pub fn magnitude(&self) -> Option<f64> {
        self.xyz()
            .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
    }
}

/// Trip lifecycle requests coming from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCommand {
    Start,
    Stop,
    Reset,
}

/// Everything the session controller consumes, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    Location(LocationFix),
    Sensor(SensorSample),
    Command { command: TripCommand, timestamp: i64 },
}

impl SensorEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            SensorEvent::Location(fix) => fix.timestamp,
            SensorEvent::Sensor(sample) => sample.timestamp,
            SensorEvent::Command { timestamp, .. } => *timestamp,
        }
    }
}
