//! Data model for workout export.

pub mod types;

pub use types::{
    ActivityKind, ExportError, HeartRateSample, MergedRecord, RoutePoint, WorkoutRecord,
};
