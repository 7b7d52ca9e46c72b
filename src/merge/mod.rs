//! Timestamp-based merge of route points and heart-rate samples.

use crate::model::types::{HeartRateSample, MergedRecord, RoutePoint};

/// Merge heart-rate samples onto route points by timestamp.
///
/// Both inputs must be ordered non-decreasing by timestamp. A single forward
/// scan with two cursors: for each route point the sample cursor advances
/// while the next sample's timestamp is at or before the point's timestamp,
/// and the last sample consumed supplies the point's effective heart rate.
/// The last-known value carries forward once the samples are exhausted; it
/// never resets. O(N+M), no allocation beyond the output.
pub fn merge_heart_rate(route: &[RoutePoint], samples: &[HeartRateSample]) -> Vec<MergedRecord> {
    let mut cursor = 0;
    let mut current: Option<f64> = None;
    let mut merged = Vec::with_capacity(route.len());

    for point in route {
        while cursor < samples.len() && samples[cursor].timestamp <= point.timestamp {
            current = Some(samples[cursor].bpm);
            cursor += 1;
        }
        merged.push(MergedRecord {
            latitude: point.latitude,
            longitude: point.longitude,
            altitude_meters: point.altitude_meters,
            timestamp: point.timestamp,
            heart_rate: current,
        });
    }

    merged
}
