//! Core types for workout data and export errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of recorded activity.
///
/// Closed set: display label and FIT sport code are resolved through the
/// two lookup methods below rather than any open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivityKind {
    Cycling,
    Running,
    Walking,
    Hiking,
    Swimming,
    #[default]
    Generic,
}

impl ActivityKind {
    /// Human-readable activity label, used in track names and filenames.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Cycling => "Cycling",
            ActivityKind::Running => "Running",
            ActivityKind::Walking => "Walking",
            ActivityKind::Hiking => "Hiking",
            ActivityKind::Swimming => "Swimming",
            ActivityKind::Generic => "Workout",
        }
    }

    /// ANT/FIT sport code for the Session message.
    pub fn sport_code(&self) -> u8 {
        match self {
            ActivityKind::Generic => 0,
            ActivityKind::Running => 1,
            ActivityKind::Cycling => 2,
            ActivityKind::Swimming => 5,
            ActivityKind::Walking => 11,
            ActivityKind::Hiking => 17,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single GPS fix on the recorded route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude_meters: f64,
    /// Fix timestamp
    pub timestamp: DateTime<Utc>,
}

/// A single heart-rate reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Heart rate in beats per minute
    pub bpm: f64,
    /// Sample timestamp
    pub timestamp: DateTime<Utc>,
}

/// One workout as handed to the export core.
///
/// Both `route` and `heart_rate` are ordered non-decreasing by timestamp.
/// That is a caller obligation; the core does not re-sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Kind of activity
    pub activity: ActivityKind,
    /// Workout start timestamp
    pub start_time: DateTime<Utc>,
    /// Workout duration in seconds
    pub duration_seconds: f64,
    /// Ordered GPS route
    pub route: Vec<RoutePoint>,
    /// Ordered heart-rate samples
    pub heart_rate: Vec<HeartRateSample>,
}

impl WorkoutRecord {
    /// Human title for the workout: activity label plus formatted start time.
    pub fn name(&self) -> String {
        format!(
            "{} - {}",
            self.activity.label(),
            self.start_time.format("%b %-d, %Y at %H:%M")
        )
    }

    /// Filename stem: `yyyy-MM-dd HH.mm.ss - <activity label>`.
    pub fn file_stem(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%Y-%m-%d %H.%M.%S"),
            self.activity.label()
        )
    }

    /// Maximum heart rate over all samples, 0 when none recorded.
    pub fn max_heart_rate(&self) -> u32 {
        self.heart_rate
            .iter()
            .map(|s| s.bpm)
            .fold(f64::NAN, f64::max)
            .max(0.0) as u32
    }

    /// Average heart rate over all samples, 0 when none recorded.
    pub fn average_heart_rate(&self) -> u32 {
        if self.heart_rate.is_empty() {
            return 0;
        }
        let sum: f64 = self.heart_rate.iter().map(|s| s.bpm).sum();
        (sum / self.heart_rate.len() as f64) as u32
    }

    /// Maximum heart rate formatted for display.
    pub fn formatted_max_heart_rate(&self) -> String {
        format!("{} bpm", self.max_heart_rate())
    }

    /// Average heart rate formatted for display.
    pub fn formatted_average_heart_rate(&self) -> String {
        format!("{} bpm", self.average_heart_rate())
    }

    /// Workout end timestamp (start plus duration).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::milliseconds((self.duration_seconds * 1000.0) as i64)
    }
}

/// A route point annotated with the heart rate in effect at its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude_meters: f64,
    /// Point timestamp
    pub timestamp: DateTime<Utc>,
    /// Effective heart rate in bpm, `None` until the first sample is observed
    pub heart_rate: Option<f64>,
}

/// Errors during workout export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No route points to export
    #[error("Workout has no data to export")]
    NoData,

    /// XML generation error
    #[error("XML error: {0}")]
    XmlError(String),

    /// A field failed strict validation during FIT encoding
    #[error("Invalid value for field {field} in {message} message")]
    InvalidField {
        /// FIT message the field belongs to
        message: &'static str,
        /// Field name within the message
        field: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
