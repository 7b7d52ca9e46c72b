//! Abstract access to the external health-data platform.
//!
//! The export core never talks to the platform directly; it receives a
//! [`WorkoutStore`] implementation that can list workouts and fetch the
//! route and heart-rate series for one of them.

use crate::model::types::{ActivityKind, HeartRateSample, RoutePoint, WorkoutRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Summary metadata for one stored workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutMetadata {
    /// Store identifier
    pub id: Uuid,
    /// Kind of activity
    pub activity: ActivityKind,
    /// Workout start timestamp
    pub start_time: DateTime<Utc>,
    /// Workout duration in seconds
    pub duration_seconds: f64,
}

impl WorkoutMetadata {
    /// Month grouping key for workout lists, e.g. "March 2025".
    pub fn month_label(&self) -> String {
        self.start_time.format("%B %Y").to_string()
    }
}

/// Errors from the workout store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform is not available on this device or not authorized
    #[error("Workout store unavailable: {0}")]
    Unavailable(String),

    /// No workout with the given id
    #[error("Workout not found: {0}")]
    NotFound(Uuid),

    /// Backend failure while fetching data
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Async source of workouts and their sample series.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// List all stored workouts, newest first.
    async fn list_workouts(&self) -> Result<Vec<WorkoutMetadata>, StoreError>;

    /// Fetch the ordered GPS route for one workout.
    async fn fetch_route(&self, workout: Uuid) -> Result<Vec<RoutePoint>, StoreError>;

    /// Fetch the ordered heart-rate samples for one workout.
    async fn fetch_heart_rate(&self, workout: Uuid) -> Result<Vec<HeartRateSample>, StoreError>;
}

/// Assemble a [`WorkoutRecord`] from the store's two sample series.
pub async fn load_workout(
    store: &dyn WorkoutStore,
    meta: &WorkoutMetadata,
) -> Result<WorkoutRecord, StoreError> {
    let route = store.fetch_route(meta.id).await?;
    let heart_rate = store.fetch_heart_rate(meta.id).await?;
    Ok(WorkoutRecord {
        activity: meta.activity,
        start_time: meta.start_time,
        duration_seconds: meta.duration_seconds,
        route,
        heart_rate,
    })
}
