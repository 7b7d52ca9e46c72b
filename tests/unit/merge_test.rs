//! Unit tests for the route/heart-rate merge.

use chrono::{DateTime, Duration, TimeZone, Utc};
use workout_export::merge_heart_rate;
use workout_export::{HeartRateSample, RoutePoint};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()
}

fn point(lat: f64, lon: f64, alt: f64, offset_secs: i64) -> RoutePoint {
    RoutePoint {
        latitude: lat,
        longitude: lon,
        altitude_meters: alt,
        timestamp: t0() + Duration::seconds(offset_secs),
    }
}

fn sample(bpm: f64, offset_secs: i64) -> HeartRateSample {
    HeartRateSample {
        bpm,
        timestamp: t0() + Duration::seconds(offset_secs),
    }
}

#[test]
fn test_cardinality_matches_route() {
    let route: Vec<RoutePoint> = (0..137).map(|i| point(47.0, 8.0, 400.0, i)).collect();
    let samples: Vec<HeartRateSample> = (0..19).map(|i| sample(100.0, i * 9)).collect();

    let merged = merge_heart_rate(&route, &samples);
    assert_eq!(merged.len(), 137);
}

#[test]
fn test_monotonic_cursor_effective_rates_never_regress_in_time() {
    // With strictly increasing sample values the effective heart rate is
    // non-decreasing across the scan, which pins the cursor as monotonic.
    let route: Vec<RoutePoint> = (0..60).map(|i| point(47.0, 8.0, 400.0, i * 2)).collect();
    let samples: Vec<HeartRateSample> = (0..30).map(|i| sample(i as f64, i * 3)).collect();

    let merged = merge_heart_rate(&route, &samples);
    let mut previous = f64::MIN;
    for record in merged.iter().filter_map(|r| r.heart_rate) {
        assert!(record >= previous);
        previous = record;
    }
}

#[test]
fn test_unequal_lengths_more_samples_than_points() {
    let route = vec![point(47.0, 8.0, 400.0, 100)];
    let samples: Vec<HeartRateSample> = (0..500).map(|i| sample(60.0 + i as f64, i)).collect();

    let merged = merge_heart_rate(&route, &samples);
    assert_eq!(merged.len(), 1);
    // Last sample at or before t0+100s is the one at offset 100
    assert_eq!(merged[0].heart_rate, Some(160.0));
}

#[test]
fn test_single_sample_before_route_covers_all_points() {
    let route = vec![
        point(0.0, 0.0, 10.0, 0),
        point(0.001, 0.001, 12.0, 10),
    ];
    let samples = vec![sample(70.0, -5)];

    let merged = merge_heart_rate(&route, &samples);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].heart_rate, Some(70.0));
    assert_eq!(merged[1].heart_rate, Some(70.0));
}

#[test]
fn test_empty_heart_rate_all_unknown() {
    let route = vec![point(0.0, 0.0, 10.0, 0), point(0.001, 0.001, 12.0, 10)];

    let merged = merge_heart_rate(&route, &[]);
    assert!(merged.iter().all(|r| r.heart_rate.is_none()));
}

#[test]
fn test_duplicate_sample_timestamps_later_wins() {
    let route = vec![point(0.0, 0.0, 10.0, 0)];
    let samples = vec![sample(60.0, 0), sample(65.0, 0)];

    let merged = merge_heart_rate(&route, &samples);
    assert_eq!(merged[0].heart_rate, Some(65.0));
}

#[test]
fn test_forward_fill_never_resets() {
    let route: Vec<RoutePoint> = (0..10).map(|i| point(47.0, 8.0, 400.0, i * 60)).collect();
    let samples = vec![sample(90.0, 30)];

    let merged = merge_heart_rate(&route, &samples);
    assert_eq!(merged[0].heart_rate, None);
    for record in &merged[1..] {
        assert_eq!(record.heart_rate, Some(90.0));
    }
}
