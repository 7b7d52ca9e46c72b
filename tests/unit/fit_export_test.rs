//! Unit tests for FIT export: wire layout, message order, CRC integrity.

use chrono::{DateTime, Duration, TimeZone, Utc};
use workout_export::export::exporter_fit::{
    build_message_set, calculate_crc, encode_with_created, export_fit,
};
use workout_export::merge_heart_rate;
use workout_export::{
    ActivityKind, CoordinateUnit, DataValidity, ExportError, FitEncoderConfig, HeartRateSample,
    RoutePoint, WorkoutRecord,
};

fn create_test_workout(points: usize) -> WorkoutRecord {
    let t0 = Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap();
    WorkoutRecord {
        activity: ActivityKind::Running,
        start_time: t0,
        duration_seconds: (points as f64) * 5.0,
        route: (0..points)
            .map(|i| RoutePoint {
                latitude: 47.36 + i as f64 * 0.0001,
                longitude: 8.54 + i as f64 * 0.0001,
                altitude_meters: 408.0,
                timestamp: t0 + Duration::seconds(i as i64 * 5),
            })
            .collect(),
        heart_rate: (0..points / 2)
            .map(|i| HeartRateSample {
                bpm: 140.0,
                timestamp: t0 + Duration::seconds(i as i64 * 10),
            })
            .collect(),
    }
}

fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap()
}

/// Walk the message stream and return (global message number, count) pairs
/// in first-seen order. Verifies record framing as a side effect.
fn message_counts(data: &[u8]) -> Vec<(u16, usize)> {
    let header_size = data[0] as usize;
    let data_size = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
    let mut offset = header_size;
    let end = header_size + data_size;

    // local -> (global, data message size)
    let mut definitions: Vec<Option<(u16, usize)>> = vec![None; 16];
    let mut counts: Vec<(u16, usize)> = Vec::new();

    while offset < end {
        let header = data[offset];
        let local = (header & 0x0F) as usize;
        if header & 0x40 != 0 {
            // Definition: reserved, arch, global (2), field count, fields * 3
            let global = u16::from_le_bytes(data[offset + 3..offset + 5].try_into().unwrap());
            let field_count = data[offset + 5] as usize;
            let mut size = 0usize;
            for i in 0..field_count {
                size += data[offset + 6 + i * 3 + 1] as usize;
            }
            definitions[local] = Some((global, size));
            offset += 6 + field_count * 3;
        } else {
            let (global, size) = definitions[local].expect("data before definition");
            match counts.iter_mut().find(|(g, _)| *g == global) {
                Some((_, n)) => *n += 1,
                None => counts.push((global, 1)),
            }
            offset += 1 + size;
        }
    }
    assert_eq!(offset, end, "message stream misaligned");
    counts
}

#[test]
fn test_fit_message_order_and_record_count() {
    let workout = create_test_workout(12);
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    let data =
        encode_with_created(&workout, &records, &FitEncoderConfig::default(), created()).unwrap();

    let counts = message_counts(&data);
    let order: Vec<u16> = counts.iter().map(|(g, _)| *g).collect();
    assert_eq!(order, vec![0, 34, 20, 18, 23]);

    let record_count = counts.iter().find(|(g, _)| *g == 20).unwrap().1;
    assert_eq!(record_count, 12);
}

#[test]
fn test_fit_crc_matches_recomputation() {
    let workout = create_test_workout(12);
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    let data = export_fit(&workout, &records, &FitEncoderConfig::default()).unwrap();

    let trailer = u16::from_le_bytes(data[data.len() - 2..].try_into().unwrap());
    assert_eq!(trailer, calculate_crc(&data[..data.len() - 2]));
    // The running CRC over the whole file including the trailer is zero
    assert_eq!(calculate_crc(&data), 0);
}

#[test]
fn test_fit_header_crc() {
    let workout = create_test_workout(3);
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    let data = export_fit(&workout, &records, &FitEncoderConfig::default()).unwrap();

    let header_crc = u16::from_le_bytes(data[12..14].try_into().unwrap());
    assert_eq!(header_crc, calculate_crc(&data[..12]));
}

#[test]
fn test_fit_idempotent_for_fixed_creation_time() {
    let workout = create_test_workout(30);
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    let config = FitEncoderConfig::default();

    let first = encode_with_created(&workout, &records, &config, created()).unwrap();
    let second = encode_with_created(&workout, &records, &config, created()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fit_empty_heart_rate_writes_zero_sentinel() {
    let mut workout = create_test_workout(4);
    workout.heart_rate.clear();
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);
    let messages =
        build_message_set(&workout, &records, &FitEncoderConfig::default(), created()).unwrap();

    for message in messages.iter().filter(|m| m.global == 20) {
        let hr = message.fields.iter().find(|f| f.num == 3).unwrap();
        assert_eq!(
            hr.value,
            workout_export::export::exporter_fit::FieldValue::Uint8(Some(0))
        );
    }
}

#[test]
fn test_fit_strict_rejects_out_of_range_heart_rate() {
    let mut workout = create_test_workout(4);
    workout.heart_rate = vec![HeartRateSample {
        bpm: 900.0,
        timestamp: workout.start_time,
    }];
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);

    let config = FitEncoderConfig {
        validity: DataValidity::Strict,
        ..Default::default()
    };
    let err = export_fit(&workout, &records, &config).unwrap_err();
    assert!(matches!(
        err,
        ExportError::InvalidField {
            message: "record",
            field: "heart_rate"
        }
    ));
}

#[test]
fn test_fit_permissive_passes_bad_values_as_sentinels() {
    let mut workout = create_test_workout(4);
    workout.route[0].longitude = 500.0;
    workout.heart_rate = vec![HeartRateSample {
        bpm: 900.0,
        timestamp: workout.start_time,
    }];
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);

    let config = FitEncoderConfig {
        validity: DataValidity::Permissive,
        ..Default::default()
    };
    // Whole-buffer success; bad fields degraded, nothing aborted
    let data = export_fit(&workout, &records, &config).unwrap();
    assert_eq!(calculate_crc(&data), 0);
}

#[test]
fn test_fit_coordinate_unit_changes_position_bytes() {
    let workout = create_test_workout(4);
    let records = merge_heart_rate(&workout.route, &workout.heart_rate);

    let semicircles = FitEncoderConfig {
        coordinate_unit: CoordinateUnit::Semicircles,
        ..Default::default()
    };
    let degrees = FitEncoderConfig {
        coordinate_unit: CoordinateUnit::Degrees,
        ..Default::default()
    };
    let a = encode_with_created(&workout, &records, &semicircles, created()).unwrap();
    let b = encode_with_created(&workout, &records, &degrees, created()).unwrap();
    assert_ne!(a, b);
    assert_eq!(a.len(), b.len());
}
