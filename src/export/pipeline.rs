//! Export pipeline: format selection, file naming, background execution.
//!
//! Each export is one independent unit of background work. The pipeline
//! merges the heart-rate series onto the route, runs the selected encoder
//! to a complete in-memory buffer, and only then writes the target file,
//! so no failure path leaves a partial file behind.

use crate::export::exporter_fit::{export_fit, FitEncoderConfig};
use crate::export::exporter_gpx::export_gpx;
use crate::merge::merge_heart_rate;
use crate::model::types::{ExportError, WorkoutRecord};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// GPX 1.1 (XML, track with heart-rate extension)
    Gpx,
    /// FIT (binary, Garmin native)
    Fit,
}

impl ExportFormat {
    /// File extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Gpx => "gpx",
            ExportFormat::Fit => "fit",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Gpx => write!(f, "GPX"),
            ExportFormat::Fit => write!(f, "FIT"),
        }
    }
}

/// Deterministic filename for a workout export:
/// `<yyyy-MM-dd HH.mm.ss> - <activity label>.<ext>`.
pub fn export_filename(workout: &WorkoutRecord, format: ExportFormat) -> String {
    format!("{}.{}", workout.file_stem(), format.extension())
}

/// Encode a workout into a complete byte buffer in the selected format.
pub fn encode(workout: &WorkoutRecord, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    match format {
        ExportFormat::Gpx => export_gpx(workout, &records).map(String::into_bytes),
        ExportFormat::Fit => export_fit(workout, &records, &FitEncoderConfig::default()),
    }
}

/// Export a workout to a file in `dir`, replacing any pre-existing file at
/// that path. Returns the written file location.
pub fn export_to_file(
    workout: &WorkoutRecord,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let content = encode(workout, format)?;
    let path = dir.join(export_filename(workout, format));
    std::fs::write(&path, content)?;
    tracing::info!(
        "Exported {} workout with {} points to {}",
        format,
        workout.route.len(),
        path.display()
    );
    Ok(path)
}

/// Export a workout on a background task.
///
/// The returned channel delivers the file location or the failure back to
/// the caller's context; dropping the receiver simply discards the result.
pub fn spawn_export(
    workout: WorkoutRecord,
    format: ExportFormat,
    dir: PathBuf,
) -> oneshot::Receiver<Result<PathBuf, ExportError>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = export_to_file(&workout, format, &dir);
        // Receiver may be gone; nothing to do then.
        let _ = tx.send(result);
    });
    rx
}

/// Export a batch of workouts, one independent task per workout.
///
/// Joins on all tasks and returns the locations of the files that were
/// written. A single workout's failure is logged and omitted from the
/// result; it never aborts the rest of the batch.
pub async fn export_all(
    workouts: Vec<WorkoutRecord>,
    format: ExportFormat,
    dir: PathBuf,
) -> Vec<PathBuf> {
    let tasks: Vec<_> = workouts
        .into_iter()
        .map(|workout| spawn_export(workout, format, dir.clone()))
        .collect();

    let mut paths = Vec::with_capacity(tasks.len());
    for completion in futures::future::join_all(tasks).await {
        match completion {
            Ok(Ok(path)) => paths.push(path),
            Ok(Err(err)) => tracing::warn!("Workout export failed: {err}"),
            Err(_) => tracing::warn!("Workout export task dropped before completing"),
        }
    }
    paths
}
