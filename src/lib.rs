// GNSS trip tracking core
// Fuses location fixes with linear acceleration and rotation-vector samples
// to classify motion, resolve heading and accumulate trips.

pub mod config;
pub mod error;
pub mod event_log;
pub mod heading;
pub mod motion;
pub mod record;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod trip;

pub use config::TrackerConfig;
pub use error::{StorageError, TrackerError, TrackerResult, TripError};
pub use event_log::EventLog;
pub use heading::{resolve_heading, Direction, HeadingState};
pub use motion::{classify, MotionClassifier, MotionState, MotionThresholds};
pub use record::{TransportMode, TripRecord, TripSummary};
pub use sensors::{LocationFix, SensorEvent, SensorKind, SensorSample, TripCommand};
pub use session::{SessionSnapshot, TripSession};
pub use storage::{JsonTripStore, MemorySink, TripSink};
pub use trip::{format_elapsed, haversine_distance, TripAccumulator, TripState};
