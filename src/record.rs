use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensors::LocationFix;

/// Transport mode guessed from average speed (m/s bands)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Stationary,
    Walking,
    Running,
    Cycling,
    Car,
    /// Kept for records written by older builds; speed analysis never yields it
    Train,
    HighSpeed,
}

impl TransportMode {
    /// Upper bound (exclusive) of each band, checked in order.
    const BANDS: [(f64, TransportMode); 5] = [
        (0.3, TransportMode::Stationary),
        (2.0, TransportMode::Walking),
        (5.0, TransportMode::Running),
        (10.0, TransportMode::Cycling),
        (40.0, TransportMode::Car),
    ];

    pub fn from_average_speed(avg_speed: f64) -> Self {
        Self::BANDS
            .iter()
            .find(|(max, _)| avg_speed < *max)
            .map(|(_, mode)| *mode)
            .unwrap_or(TransportMode::HighSpeed)
    }
}

/// Completed trip as handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Trip start, ms since epoch. Also the record's identity in storage.
    pub start_time: i64,
    pub end_time: i64,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
    /// Meters
    pub total_distance: f64,
    /// m/s
    pub average_speed: f64,
    pub transport_mode: TransportMode,
    /// Fixes in arrival order, starting with the trip origin
    pub points: Vec<LocationFix>,
}

impl TripRecord {
    pub fn new(
        start_time: i64,
        start: &LocationFix,
        end: &LocationFix,
        total_distance: f64,
        points: Vec<LocationFix>,
    ) -> Self {
        let end_time = end.timestamp.max(start_time);
        let average_speed = average_speed(total_distance, start_time, end_time);

        Self {
            start_time,
            end_time,
            start_latitude: start.latitude,
            start_longitude: start.longitude,
            end_latitude: end.latitude,
            end_longitude: end.longitude,
            total_distance,
            average_speed,
            transport_mode: TransportMode::from_average_speed(average_speed),
            points,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time) / 1000
    }

    pub fn summary(&self) -> TripSummary {
        TripSummary {
            start_time: self.start_time,
            end_time: self.end_time,
            total_distance: self.total_distance,
            average_speed: self.average_speed,
            transport_mode: self.transport_mode,
            point_count: self.points.len(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// GPX 1.1 document with one track segment
    pub fn to_gpx(&self) -> String {
        let name = format!("Trip {}", format_timestamp(self.start_time));
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"gnss_trip\">\n");
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", name));
        xml.push_str(&format!(
            "    <desc>{:.2} m, {:?}</desc>\n",
            self.total_distance, self.transport_mode
        ));
        xml.push_str("  </metadata>\n");
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", name));
        xml.push_str("    <trkseg>\n");

        for point in &self.points {
            xml.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\">\n",
                point.latitude, point.longitude
            ));
            xml.push_str(&format!("        <ele>{}</ele>\n", point.altitude));
            xml.push_str(&format!("        <time>{}</time>\n", rfc3339(point.timestamp)));
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");
        xml
    }

    /// Track points as CSV, one row per fix
    pub fn to_csv(&self) -> String {
        let mut csv =
            String::from("time,latitude,longitude,altitude,speed,bearing,accuracy,provider\n");
        for p in &self.points {
            let speed = p.speed.map(|s| s.to_string()).unwrap_or_default();
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                p.timestamp,
                p.latitude,
                p.longitude,
                p.altitude,
                speed,
                p.bearing,
                p.accuracy,
                p.provider
            ));
        }
        csv
    }
}

/// One row of the trip history list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub start_time: i64,
    pub end_time: i64,
    pub total_distance: f64,
    pub average_speed: f64,
    pub transport_mode: TransportMode,
    pub point_count: usize,
}

impl TripSummary {
    /// "MM.dd HH:mm" labels for the start and end of the trip
    pub fn time_labels(&self) -> (String, String) {
        (
            format_with(self.start_time, "%m.%d %H:%M"),
            format_with(self.end_time, "%m.%d %H:%M"),
        )
    }
}

/// Distance over whole elapsed seconds; zero for sub-second trips.
pub fn average_speed(distance: f64, start_ms: i64, end_ms: i64) -> f64 {
    let seconds = (end_ms - start_ms) / 1000;
    if seconds > 0 {
        distance / seconds as f64
    } else {
        0.0
    }
}

/// "MM.dd HH:mm:ss" in UTC, as shown next to a fix
pub fn format_timestamp(ms: i64) -> String {
    format_with(ms, "%m.%d %H:%M:%S")
}

fn format_with(ms: i64, fmt: &str) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_else(|| "--".to_string())
}

fn rfc3339(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TripRecord {
        let a = LocationFix::new(40.0, -120.0, 0).with_altitude(100.0).with_speed(1.2);
        let b = LocationFix::new(40.01, -120.01, 600_000).with_altitude(105.0);
        TripRecord::new(0, &a, &b, 1_200.0, vec![a.clone(), b.clone()])
    }

    #[test]
    fn test_speed_bands() {
        assert_eq!(TransportMode::from_average_speed(0.0), TransportMode::Stationary);
        assert_eq!(TransportMode::from_average_speed(0.29), TransportMode::Stationary);
        assert_eq!(TransportMode::from_average_speed(0.3), TransportMode::Walking);
        assert_eq!(TransportMode::from_average_speed(1.9), TransportMode::Walking);
        assert_eq!(TransportMode::from_average_speed(3.0), TransportMode::Running);
        assert_eq!(TransportMode::from_average_speed(7.0), TransportMode::Cycling);
        assert_eq!(TransportMode::from_average_speed(25.0), TransportMode::Car);
        assert_eq!(TransportMode::from_average_speed(40.0), TransportMode::HighSpeed);
    }

    #[test]
    fn test_average_speed_whole_seconds() {
        assert_eq!(average_speed(100.0, 0, 999), 0.0);
        assert_eq!(average_speed(100.0, 0, 10_500), 10.0);
    }

    #[test]
    fn test_record_summary() {
        let record = sample_record();
        assert_eq!(record.duration_seconds(), 600);
        assert_eq!(record.average_speed, 2.0);
        assert_eq!(record.transport_mode, TransportMode::Running);

        let summary = record.summary();
        assert_eq!(summary.point_count, 2);
        assert_eq!(summary.time_labels().0, "01.01 00:00");
        assert_eq!(summary.time_labels().1, "01.01 00:10");
    }

    #[test]
    fn test_gpx_generation() {
        let gpx = sample_record().to_gpx();
        assert!(gpx.contains("<gpx version=\"1.1\""));
        assert!(gpx.contains("lat=\"40.01\" lon=\"-120.01\""));
        assert!(gpx.contains("<ele>105</ele>"));
        assert_eq!(gpx.matches("<trkpt").count(), 2);
    }

    #[test]
    fn test_csv_rows() {
        let csv = sample_record().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time,latitude"));
        assert_eq!(lines[1], "0,40,-120,100,1.2,0,0,gps");
        // Missing speed leaves the column empty
        assert!(lines[2].contains(",105,,0,"));
    }

    #[test]
    fn test_json_round_trip_keeps_mode() {
        let json = sample_record().to_json().unwrap();
        assert!(json.contains("\"transport_mode\": \"running\""));
        let back: TripRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_record());
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(3_661_000), "01.01 01:01:01");
    }
}
