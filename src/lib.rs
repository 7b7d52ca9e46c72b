//! workout-export - Workout Export Library
//!
//! Exports a recorded workout (GPS route plus heart-rate samples) to the
//! GPX 1.1 and FIT interchange formats. Provides the data model, a
//! timestamp-based merge of route and heart-rate series, both encoders,
//! and an async export pipeline with per-workout completion delivery.

pub mod export;
pub mod merge;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use export::exporter_fit::{CoordinateUnit, DataValidity, FitEncoderConfig};
pub use export::pipeline::{export_all, export_to_file, spawn_export, ExportFormat};
pub use merge::merge_heart_rate;
pub use model::types::{
    ActivityKind, ExportError, HeartRateSample, MergedRecord, RoutePoint, WorkoutRecord,
};
pub use store::{StoreError, WorkoutMetadata, WorkoutStore};
