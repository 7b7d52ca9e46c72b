//! Encoders and export pipeline for workout data.

pub mod exporter_fit;
pub mod exporter_gpx;
pub mod pipeline;

pub use exporter_fit::{export_fit, CoordinateUnit, DataValidity, FitEncoderConfig};
pub use exporter_gpx::export_gpx;
pub use pipeline::{export_all, export_filename, export_to_file, spawn_export, ExportFormat};
