use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::config::TrackerConfig;
use crate::error::{TrackerResult, TripError};
use crate::heading::{resolve_heading, HeadingState};
use crate::motion::MotionClassifier;
use crate::record::TripRecord;
use crate::sensors::{LocationFix, SensorEvent, SensorKind, SensorSample, TripCommand};
use crate::storage::TripSink;
use crate::trip::{format_distance, TripAccumulator, TripState};

/// What the presentation layer renders after each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub trip_state: TripState,
    pub stationary: bool,
    pub accel_magnitude: f64,
    pub heading: HeadingState,
    pub elapsed: String,
    pub distance_meters: f64,
    pub distance_label: String,
    pub latest_fix: Option<LocationFix>,
    pub fix_count: u64,
    pub sample_count: u64,
    pub skipped_samples: u64,
    pub trips_completed: u32,
    /// Transient user notice, e.g. "wait for signal"
    pub notice: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            trip_state: TripState::Idle,
            stationary: false,
            accel_magnitude: 0.0,
            heading: HeadingState::default(),
            elapsed: "00:00:00".to_string(),
            distance_meters: 0.0,
            distance_label: format_distance(0.0),
            latest_fix: None,
            fix_count: 0,
            sample_count: 0,
            skipped_samples: 0,
            trips_completed: 0,
            notice: None,
        }
    }
}

/// Sole owner of the live tracking state.
///
/// Events go in through [`TripSession::handle_event`] or [`TripSession::run`];
/// observers follow along through [`TripSession::subscribe`].
pub struct TripSession<S: TripSink> {
    latest_fix: Option<LocationFix>,
    motion: MotionClassifier,
    heading: HeadingState,
    trip: TripAccumulator,
    elapsed: String,
    sink: S,
    auto_start: bool,
    fix_count: u64,
    sample_count: u64,
    skipped_samples: u64,
    trips_completed: u32,
    notice: Option<String>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<S: TripSink> TripSession<S> {
    pub fn new(config: &TrackerConfig, sink: S) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            latest_fix: None,
            motion: MotionClassifier::new(config.thresholds()),
            heading: HeadingState::default(),
            trip: TripAccumulator::new(),
            elapsed: "00:00:00".to_string(),
            sink,
            auto_start: config.auto_start,
            fix_count: 0,
            sample_count: 0,
            skipped_samples: 0,
            trips_completed: 0,
            notice: None,
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            trip_state: self.trip.state(),
            stationary: self.motion.is_stationary(),
            accel_magnitude: self.motion.state().accel_magnitude,
            heading: self.heading,
            elapsed: self.elapsed.clone(),
            distance_meters: self.trip.distance(),
            distance_label: format_distance(self.trip.distance()),
            latest_fix: self.latest_fix.clone(),
            fix_count: self.fix_count,
            sample_count: self.sample_count,
            skipped_samples: self.skipped_samples,
            trips_completed: self.trips_completed,
            notice: self.notice.clone(),
        }
    }

    pub fn trip(&self) -> &TripAccumulator {
        &self.trip
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Applies one event and publishes the resulting snapshot, failed or not.
    pub fn handle_event(&mut self, event: SensorEvent) -> TrackerResult<()> {
        self.notice = None;
        let result = match event {
            SensorEvent::Location(fix) => {
                self.on_location(fix);
                Ok(())
            }
            SensorEvent::Sensor(sample) => {
                self.on_sensor(&sample);
                Ok(())
            }
            SensorEvent::Command { command, timestamp } => self.on_command(command, timestamp),
        };
        if let Err(e) = &result {
            self.notice = Some(e.to_string());
        }
        self.publish();
        result
    }

    /// Consumes events strictly in arrival order until every sender is gone.
    /// A failed event is logged and the loop moves on to the next one. A trip
    /// still running at the end is stopped and saved.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<SensorEvent>) -> TrackerResult<()> {
        while let Some(event) = rx.recv().await {
            let timestamp = event.timestamp();
            if let Err(e) = self.handle_event(event) {
                error!("Event at t={} failed: {}", timestamp, e);
            }
        }

        if self.trip.is_active() {
            info!("Event stream closed with a trip running, stopping it");
            self.stop_trip()?;
            self.publish();
        }
        Ok(())
    }

    pub fn start_trip(&mut self) -> Result<(), TripError> {
        let was_active = self.trip.is_active();
        let result = self.trip.start();
        match &result {
            Ok(()) if !was_active => {
                if let Some(start) = self.trip.start_time() {
                    self.elapsed = self.trip.elapsed(start);
                }
            }
            Ok(()) => debug!("Start ignored, trip already running"),
            Err(e) => self.notice = Some(e.to_string()),
        }
        result
    }

    /// Stops the running trip and hands the record to the sink.
    ///
    /// The trip stays active with all its points when the sink fails, so the
    /// stop can be retried.
    pub fn stop_trip(&mut self) -> TrackerResult<TripRecord> {
        let record = self.trip.completed_record(self.latest_fix.as_ref())?;
        if let Err(e) = self.sink.save(&record) {
            warn!("Saving trip {} failed, keeping it open: {}", record.start_time, e);
            return Err(e.into());
        }
        self.trip.finish(&record);
        self.trips_completed += 1;
        self.elapsed = "00:00:00".to_string();
        Ok(record)
    }

    pub fn reset_trip(&mut self) {
        self.trip.reset();
        self.elapsed = "00:00:00".to_string();
    }

    fn on_location(&mut self, fix: LocationFix) {
        if fix.is_unlocated() {
            if self.trip.is_active() {
                debug!("Skipping unlocated placeholder fix during trip");
            } else {
                debug!("Unlocated placeholder fix, dropping known position");
                self.trip.observe(&fix);
                self.latest_fix = None;
            }
            return;
        }
        self.fix_count += 1;

        let stationary = self.motion.is_stationary();
        if self.trip.is_active() {
            self.elapsed = self.trip.elapsed(fix.timestamp);
            if !stationary {
                self.trip.accumulate(&fix, false);
            }
        } else {
            self.trip.observe(&fix);
            if self.auto_start && self.trip.start().is_ok() {
                self.auto_start = false;
                self.elapsed = self.trip.elapsed(fix.timestamp);
            }
        }

        if !stationary {
            self.heading = HeadingState::from_bearing(fix.bearing);
        }
        self.latest_fix = Some(fix);
    }

    fn on_sensor(&mut self, sample: &SensorSample) {
        self.sample_count += 1;
        match sample.kind {
            SensorKind::LinearAcceleration => match sample.xyz() {
                Some(accel) => {
                    self.motion.update(self.latest_fix.as_ref(), accel);
                }
                None => self.skip(sample),
            },
            SensorKind::RotationVector => match resolve_heading(&sample.values) {
                Some(heading) => self.heading = heading,
                None => self.skip(sample),
            },
        }
    }

    fn on_command(&mut self, command: TripCommand, timestamp: i64) -> TrackerResult<()> {
        match command {
            TripCommand::Start => {
                if let Err(e) = self.start_trip() {
                    warn!("Start at t={} rejected: {}", timestamp, e);
                }
            }
            TripCommand::Stop => {
                if self.trip.is_active() {
                    self.stop_trip()?;
                } else {
                    debug!("Stop at t={} ignored, no trip running", timestamp);
                }
            }
            TripCommand::Reset => self.reset_trip(),
        }
        Ok(())
    }

    fn skip(&mut self, sample: &SensorSample) {
        self.skipped_samples += 1;
        debug!(
            "Skipping {:?} sample with {} components at t={}",
            sample.kind,
            sample.values.len(),
            sample.timestamp
        );
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
