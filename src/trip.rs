use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::TripError;
use crate::record::TripRecord;
use crate::sensors::LocationFix;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

pub fn distance_between(a: &LocationFix, b: &LocationFix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// `HH:MM:SS` for the time between two millisecond timestamps.
///
/// Integer division only, sub-second remainder is dropped. Hours do not wrap.
pub fn format_elapsed(start_ms: i64, now_ms: i64) -> String {
    let delta = (now_ms - start_ms).max(0);
    let hours = delta / 3_600_000;
    let minutes = (delta / 60_000) % 60;
    let seconds = (delta / 1000) % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn format_distance(meters: f64) -> String {
    format!("{:.2}m", meters)
}

/// Trip state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripState {
    /// No trip running
    Idle,
    /// Accumulating distance
    Active,
}

/// Accumulates one trip at a time from a stream of fixes.
///
/// Callers serialize access; the session controller is the only writer.
#[derive(Debug, Clone)]
pub struct TripAccumulator {
    state: TripState,
    last_fix: Option<LocationFix>,
    start_time: Option<i64>,
    start_fix: Option<LocationFix>,
    distance: f64,
    history: Vec<LocationFix>,
}

impl TripAccumulator {
    pub fn new() -> Self {
        Self {
            state: TripState::Idle,
            last_fix: None,
            start_time: None,
            start_fix: None,
            distance: 0.0,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TripState::Active
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn last_fix(&self) -> Option<&LocationFix> {
        self.last_fix.as_ref()
    }

    pub fn history(&self) -> &[LocationFix] {
        &self.history
    }

    /// Records the latest known position without touching the trip totals.
    ///
    /// While idle the "never located" placeholder clears the known position,
    /// so a start attempt right after it fails. A running trip keeps its
    /// anchor and skips the placeholder.
    pub fn observe(&mut self, fix: &LocationFix) {
        if fix.is_unlocated() {
            if self.is_active() {
                debug!("Unlocated placeholder skipped, trip anchor kept");
            } else {
                debug!("Unlocated placeholder observed, dropping last known fix");
                self.last_fix = None;
            }
            return;
        }
        self.last_fix = Some(fix.clone());
    }

    /// Idle → Active. Already active is a no-op.
    pub fn start(&mut self) -> Result<(), TripError> {
        if self.is_active() {
            return Ok(());
        }

        let origin = match &self.last_fix {
            Some(fix) if !fix.is_unlocated() => fix.clone(),
            _ => {
                warn!("Trip start rejected: no location fix yet");
                return Err(TripError::NotReady);
            }
        };

        info!(
            "Trip started at ({:.6}, {:.6}) t={}",
            origin.latitude, origin.longitude, origin.timestamp
        );
        self.start_time = Some(origin.timestamp);
        self.history.clear();
        self.history.push(origin.clone());
        self.start_fix = Some(origin);
        self.distance = 0.0;
        self.state = TripState::Active;
        Ok(())
    }

    /// Adds the leg from the previous fix to `fix` while a trip is running and
    /// the device is moving. Returns the running total in meters.
    pub fn accumulate(&mut self, fix: &LocationFix, stationary: bool) -> f64 {
        if !self.is_active() || stationary || fix.is_unlocated() {
            return self.distance;
        }

        if let Some(prev) = &self.last_fix {
            self.distance += distance_between(prev, fix);
        }
        self.history.push(fix.clone());
        self.last_fix = Some(fix.clone());
        self.distance
    }

    /// Clears distance, history and the timer while keeping the active flag.
    pub fn reset(&mut self) {
        self.distance = 0.0;
        self.start_time = None;
        self.history.clear();
        if self.is_active() {
            if let Some(origin) = self.last_fix.clone() {
                self.history.push(origin.clone());
                self.start_fix = Some(origin);
            }
        }
        debug!("Trip reset");
    }

    /// The record the running trip would produce if it stopped now. Leaves
    /// the trip untouched.
    ///
    /// `end` is the most recent fix the caller has seen; the trip's own last
    /// real point is used when none is given.
    pub fn completed_record(&self, end: Option<&LocationFix>) -> Result<TripRecord, TripError> {
        if !self.is_active() {
            return Err(TripError::NotActive);
        }

        let start = self
            .start_fix
            .as_ref()
            .or(self.history.first())
            .or(self.last_fix.as_ref())
            .ok_or(TripError::NotReady)?;
        let end = end
            .filter(|fix| !fix.is_unlocated())
            .or(self.last_fix.as_ref())
            .or(self.history.last())
            .unwrap_or(start);
        let start_time = self.start_time.unwrap_or(start.timestamp);

        Ok(TripRecord::new(
            start_time,
            start,
            end,
            self.distance,
            self.history.clone(),
        ))
    }

    /// Active → Idle once `record` has been handed off.
    pub fn finish(&mut self, record: &TripRecord) {
        info!(
            "Trip stopped: {:.2} m in {} s ({:?})",
            record.total_distance,
            record.duration_seconds(),
            record.transport_mode
        );
        self.clear();
    }

    /// Active → Idle, handing back the completed trip.
    pub fn stop(&mut self, end: Option<&LocationFix>) -> Result<TripRecord, TripError> {
        let record = self.completed_record(end)?;
        self.finish(&record);
        Ok(record)
    }

    /// `HH:MM:SS` since the trip started. Latches `now_ms` as the start when
    /// the timer has not started yet.
    pub fn elapsed(&mut self, now_ms: i64) -> String {
        let start = *self.start_time.get_or_insert(now_ms);
        format_elapsed(start, now_ms)
    }

    fn clear(&mut self) {
        self.state = TripState::Idle;
        self.start_time = None;
        self.start_fix = None;
        self.distance = 0.0;
        self.history.clear();
    }
}

impl Default for TripAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
