//! FIT file export functionality for workout data.
//!
//! Implements FIT (Flexible and Interoperable Data Transfer) binary format
//! export according to the ANT+ FIT SDK specification:
//! - 14-byte file header with header CRC and trailing file CRC-16
//! - Little-endian definition and data messages
//! - FileId, Activity, Record, Session and DeviceInfo messages
//!
//! Message contents are built as a typed message set first and serialized
//! afterwards, so a validation failure never produces a partial buffer.

use crate::model::types::{ExportError, MergedRecord, WorkoutRecord};
use chrono::{DateTime, Utc};
use std::io::{Cursor, Write};

/// FIT epoch offset: FIT timestamps are seconds since 1989-12-31 00:00:00 UTC
const FIT_EPOCH_OFFSET: i64 = 631065600;

/// FIT file header size
const FIT_HEADER_SIZE: u8 = 14;

/// FIT protocol version
const FIT_PROTOCOL_VERSION: u8 = 0x20; // 2.0

/// FIT profile version (21.00)
const FIT_PROFILE_VERSION: u16 = 2100;

/// Manufacturer id reported in FileId and DeviceInfo (Garmin, for compatibility)
const MANUFACTURER_ID: u16 = 1;

/// Device serial number reported in FileId and DeviceInfo
const SERIAL_NUMBER: u32 = 1;

/// Degrees to semicircles: 2^31 / 180
const SEMICIRCLES_PER_DEGREE: f64 = 2_147_483_648.0 / 180.0;

/// FIT global message numbers
mod message_type {
    pub const FILE_ID: u16 = 0;
    pub const SESSION: u16 = 18;
    pub const RECORD: u16 = 20;
    pub const DEVICE_INFO: u16 = 23;
    pub const ACTIVITY: u16 = 34;
}

/// FIT base types
mod base_type {
    pub const ENUM: u8 = 0x00;
    pub const UINT8: u8 = 0x02;
    pub const UINT16: u8 = 0x84;
    pub const SINT32: u8 = 0x85;
    pub const UINT32: u8 = 0x86;
}

/// Coordinate unit used for Record and Session position fields.
///
/// Semicircles is what consuming devices expect; Degrees writes the raw
/// degree value into the sint32 field and exists only to reproduce older
/// exports that skipped the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateUnit {
    /// Signed 32-bit fixed point, degrees * 2^31 / 180
    #[default]
    Semicircles,
    /// Raw degrees truncated into the field
    Degrees,
}

/// Policy for out-of-range or missing-but-required field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataValidity {
    /// Abort encoding with an error naming the offending field
    Strict,
    /// Replace the value with the field's sentinel
    #[default]
    Permissive,
}

/// Configuration for the FIT encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitEncoderConfig {
    /// Unit for latitude/longitude fields
    pub coordinate_unit: CoordinateUnit,
    /// Validation policy applied to every field
    pub validity: DataValidity,
}

impl FitEncoderConfig {
    /// Apply the validity policy to one field value.
    ///
    /// Returns `Ok(true)` when the value may be written, `Ok(false)` when it
    /// must be replaced by the field sentinel, and an error under strict
    /// validation. Every field goes through this one routine.
    fn check(
        &self,
        valid: bool,
        message: &'static str,
        field: &'static str,
    ) -> Result<bool, ExportError> {
        if valid {
            return Ok(true);
        }
        match self.validity {
            DataValidity::Strict => Err(ExportError::InvalidField { message, field }),
            DataValidity::Permissive => Ok(false),
        }
    }
}

/// A typed FIT field value. `None` is an absent field, serialized as the
/// base type's invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Enum(u8),
    Uint8(Option<u8>),
    Uint16(Option<u16>),
    Uint32(Option<u32>),
    Sint32(Option<i32>),
}

impl FieldValue {
    fn base_type(&self) -> u8 {
        match self {
            FieldValue::Enum(_) => base_type::ENUM,
            FieldValue::Uint8(_) => base_type::UINT8,
            FieldValue::Uint16(_) => base_type::UINT16,
            FieldValue::Uint32(_) => base_type::UINT32,
            FieldValue::Sint32(_) => base_type::SINT32,
        }
    }

    fn size(&self) -> u8 {
        match self {
            FieldValue::Enum(_) | FieldValue::Uint8(_) => 1,
            FieldValue::Uint16(_) => 2,
            FieldValue::Uint32(_) | FieldValue::Sint32(_) => 4,
        }
    }
}

/// One field of a FIT data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitField {
    /// Field definition number
    pub num: u8,
    /// Typed value
    pub value: FieldValue,
}

impl FitField {
    fn new(num: u8, value: FieldValue) -> Self {
        Self { num, value }
    }
}

/// One FIT data message: a global message number and its fields in
/// definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitMessage {
    /// Global message number
    pub global: u16,
    /// Fields in definition order
    pub fields: Vec<FitField>,
}

/// FIT file writer (header, messages, CRC trailer).
struct FitWriter {
    buffer: Cursor<Vec<u8>>,
    data_size: u32,
}

impl FitWriter {
    fn new() -> Self {
        Self {
            buffer: Cursor::new(Vec::new()),
            data_size: 0,
        }
    }

    /// Write the FIT file header
    fn write_header(&mut self) -> Result<(), ExportError> {
        self.buffer
            .write_all(&[FIT_HEADER_SIZE])
            .map_err(ExportError::IoError)?;
        self.buffer
            .write_all(&[FIT_PROTOCOL_VERSION])
            .map_err(ExportError::IoError)?;
        self.buffer
            .write_all(&FIT_PROFILE_VERSION.to_le_bytes())
            .map_err(ExportError::IoError)?;

        // Data size placeholder, patched in finalize
        self.buffer
            .write_all(&0u32.to_le_bytes())
            .map_err(ExportError::IoError)?;

        self.buffer
            .write_all(b".FIT")
            .map_err(ExportError::IoError)?;

        // Header CRC over the first 12 bytes
        let header_crc = calculate_crc(&self.buffer.get_ref()[0..12]);
        self.buffer
            .write_all(&header_crc.to_le_bytes())
            .map_err(ExportError::IoError)?;

        Ok(())
    }

    /// Write a definition message derived from the shape of a data message.
    fn write_definition(&mut self, local: u8, message: &FitMessage) -> Result<(), ExportError> {
        // Record header: definition message (bit 6 set), local num in bits 0-3
        self.write_byte(0x40 | (local & 0x0F))?;

        // Reserved byte
        self.write_byte(0)?;

        // Architecture: 0 = little endian
        self.write_byte(0)?;

        self.write_u16(message.global)?;
        self.write_byte(message.fields.len() as u8)?;

        for field in &message.fields {
            self.write_byte(field.num)?;
            self.write_byte(field.value.size())?;
            self.write_byte(field.value.base_type())?;
        }

        Ok(())
    }

    /// Write a data message (header byte plus field values).
    fn write_data(&mut self, local: u8, message: &FitMessage) -> Result<(), ExportError> {
        // Record header: data message (bit 6 clear), local num in bits 0-3
        self.write_byte(local & 0x0F)?;

        for field in &message.fields {
            match field.value {
                FieldValue::Enum(v) => self.write_byte(v)?,
                FieldValue::Uint8(v) => self.write_byte(v.unwrap_or(0xFF))?,
                FieldValue::Uint16(v) => self.write_u16(v.unwrap_or(0xFFFF))?,
                FieldValue::Uint32(v) => self.write_u32(v.unwrap_or(0xFFFF_FFFF))?,
                FieldValue::Sint32(v) => self.write_i32(v.unwrap_or(0x7FFF_FFFF))?,
            }
        }

        Ok(())
    }

    fn write_byte(&mut self, value: u8) -> Result<(), ExportError> {
        self.buffer
            .write_all(&[value])
            .map_err(ExportError::IoError)?;
        self.data_size += 1;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<(), ExportError> {
        self.buffer
            .write_all(&value.to_le_bytes())
            .map_err(ExportError::IoError)?;
        self.data_size += 2;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<(), ExportError> {
        self.buffer
            .write_all(&value.to_le_bytes())
            .map_err(ExportError::IoError)?;
        self.data_size += 4;
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), ExportError> {
        self.buffer
            .write_all(&value.to_le_bytes())
            .map_err(ExportError::IoError)?;
        self.data_size += 4;
        Ok(())
    }

    /// Finalize the file (patch data size and append the file CRC).
    fn finalize(self) -> Result<Vec<u8>, ExportError> {
        let data_size = self.data_size;
        let mut data = self.buffer.into_inner();

        data[4..8].copy_from_slice(&data_size.to_le_bytes());

        let file_crc = calculate_crc(&data[..]);
        data.extend_from_slice(&file_crc.to_le_bytes());

        Ok(data)
    }
}

/// Calculate CRC-16 for a FIT file (nibble-table algorithm from the SDK).
pub fn calculate_crc(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    let crc_table: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    for byte in data {
        let tmp = crc_table[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ crc_table[(*byte & 0xF) as usize];

        let tmp = crc_table[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ crc_table[((*byte >> 4) & 0xF) as usize];
    }

    crc
}

/// Convert a DateTime to a FIT timestamp
fn fit_timestamp(dt: DateTime<Utc>) -> u32 {
    (dt.timestamp() - FIT_EPOCH_OFFSET) as u32
}

/// Encode a latitude or longitude into the configured sint32 unit.
fn encode_coordinate(degrees: f64, unit: CoordinateUnit) -> i32 {
    match unit {
        CoordinateUnit::Semicircles => {
            let semicircles = (degrees * SEMICIRCLES_PER_DEGREE).round();
            semicircles.clamp(i32::MIN as f64, i32::MAX as f64) as i32
        }
        CoordinateUnit::Degrees => degrees as i32,
    }
}

/// Build a validated position field.
fn position_field(
    num: u8,
    degrees: f64,
    range: f64,
    message: &'static str,
    field: &'static str,
    config: &FitEncoderConfig,
) -> Result<FitField, ExportError> {
    let valid = degrees.is_finite() && degrees.abs() <= range;
    let value = if config.check(valid, message, field)? {
        FieldValue::Sint32(Some(encode_coordinate(degrees, config.coordinate_unit)))
    } else {
        FieldValue::Sint32(None)
    };
    Ok(FitField::new(num, value))
}

/// Build a validated altitude field (FIT scaling: (meters + 500) * 5).
fn altitude_field(
    num: u8,
    meters: f64,
    message: &'static str,
    config: &FitEncoderConfig,
) -> Result<FitField, ExportError> {
    let scaled = (meters + 500.0) * 5.0;
    let valid = meters.is_finite() && scaled >= 0.0 && scaled < 65535.0;
    let value = if config.check(valid, message, "altitude")? {
        FieldValue::Uint16(Some(scaled as u16))
    } else {
        FieldValue::Uint16(None)
    };
    Ok(FitField::new(num, value))
}

/// Build the heart-rate field; 0 denotes unknown on the wire.
fn heart_rate_field(
    bpm: Option<f64>,
    config: &FitEncoderConfig,
) -> Result<FitField, ExportError> {
    let value = match bpm {
        Some(bpm) => {
            let valid = bpm.is_finite() && (0.0..256.0).contains(&bpm);
            if config.check(valid, "record", "heart_rate")? {
                bpm as u8
            } else {
                0
            }
        }
        None => 0,
    };
    Ok(FitField::new(3, FieldValue::Uint8(Some(value))))
}

/// Build the ordered FIT message set for one workout.
///
/// `created` is the file-creation timestamp written into FileId; it is the
/// only input not derived from the workout itself.
pub fn build_message_set(
    workout: &WorkoutRecord,
    records: &[MergedRecord],
    config: &FitEncoderConfig,
    created: DateTime<Utc>,
) -> Result<Vec<FitMessage>, ExportError> {
    let mut messages = Vec::with_capacity(records.len() + 4);

    // FileId: type = activity (4)
    messages.push(FitMessage {
        global: message_type::FILE_ID,
        fields: vec![
            FitField::new(0, FieldValue::Enum(4)),
            FitField::new(1, FieldValue::Uint16(Some(MANUFACTURER_ID))),
            FitField::new(3, FieldValue::Uint32(Some(SERIAL_NUMBER))),
            FitField::new(4, FieldValue::Uint32(Some(fit_timestamp(created)))),
        ],
    });

    // Activity: manual activity, event = activity start
    let duration_ms = workout.duration_seconds * 1000.0;
    let duration_valid = workout.duration_seconds.is_finite() && workout.duration_seconds >= 0.0;
    let timer_time = if config.check(duration_valid, "activity", "total_timer_time")? {
        FieldValue::Uint32(Some(duration_ms as u32))
    } else {
        FieldValue::Uint32(None)
    };
    messages.push(FitMessage {
        global: message_type::ACTIVITY,
        fields: vec![
            FitField::new(253, FieldValue::Uint32(Some(fit_timestamp(workout.end_time())))),
            FitField::new(0, timer_time),
            FitField::new(2, FieldValue::Enum(0)),  // activity = manual
            FitField::new(3, FieldValue::Enum(26)), // event = activity
            FitField::new(4, FieldValue::Enum(0)),  // event_type = start
        ],
    });

    // One Record per merged route point
    for record in records {
        messages.push(FitMessage {
            global: message_type::RECORD,
            fields: vec![
                FitField::new(253, FieldValue::Uint32(Some(fit_timestamp(record.timestamp)))),
                position_field(0, record.latitude, 90.0, "record", "position_lat", config)?,
                position_field(1, record.longitude, 180.0, "record", "position_long", config)?,
                altitude_field(2, record.altitude_meters, "record", config)?,
                heart_rate_field(record.heart_rate, config)?,
            ],
        });
    }

    // Session: start/end bounds from the first and last record
    let start_position = records.first();
    let end_position = records.last();
    let session_coord = |num: u8,
                         record: Option<&MergedRecord>,
                         pick: fn(&MergedRecord) -> f64,
                         range: f64,
                         field: &'static str|
     -> Result<FitField, ExportError> {
        match record {
            Some(r) => position_field(num, pick(r), range, "session", field, config),
            None => Ok(FitField::new(num, FieldValue::Sint32(None))),
        }
    };
    messages.push(FitMessage {
        global: message_type::SESSION,
        fields: vec![
            FitField::new(253, FieldValue::Uint32(Some(fit_timestamp(workout.end_time())))),
            FitField::new(2, FieldValue::Uint32(Some(fit_timestamp(workout.start_time)))),
            session_coord(3, start_position, |r| r.latitude, 90.0, "start_position_lat")?,
            session_coord(4, start_position, |r| r.longitude, 180.0, "start_position_long")?,
            FitField::new(5, FieldValue::Enum(workout.activity.sport_code())),
            FitField::new(7, timer_time),
            session_coord(29, end_position, |r| r.latitude, 90.0, "nec_lat")?,
            session_coord(30, end_position, |r| r.longitude, 180.0, "nec_long")?,
        ],
    });

    // DeviceInfo
    messages.push(FitMessage {
        global: message_type::DEVICE_INFO,
        fields: vec![
            FitField::new(2, FieldValue::Uint16(Some(MANUFACTURER_ID))),
            FitField::new(27, FieldValue::Uint32(Some(SERIAL_NUMBER))),
        ],
    });

    Ok(messages)
}

/// Serialize a message set into a complete FIT byte buffer.
///
/// One definition message is written per global message number (message
/// shapes are constant per global), followed by its data messages.
pub fn serialize_message_set(messages: &[FitMessage]) -> Result<Vec<u8>, ExportError> {
    let mut writer = FitWriter::new();
    writer.write_header()?;

    let mut locals: Vec<(u16, u8)> = Vec::new();
    for message in messages {
        let local = match locals.iter().find(|(global, _)| *global == message.global) {
            Some((_, local)) => *local,
            None => {
                let local = locals.len() as u8;
                locals.push((message.global, local));
                writer.write_definition(local, message)?;
                local
            }
        };
        writer.write_data(local, message)?;
    }

    writer.finalize()
}

/// Export merged workout records to a complete FIT byte buffer.
///
/// The buffer is fully assembled or absent; a strict-validation failure
/// yields a structured error naming the offending message and field.
pub fn export_fit(
    workout: &WorkoutRecord,
    records: &[MergedRecord],
    config: &FitEncoderConfig,
) -> Result<Vec<u8>, ExportError> {
    encode_with_created(workout, records, config, Utc::now())
}

/// Like [`export_fit`] with an explicit file-creation timestamp, which is
/// the only wall-clock input. Two calls with the same arguments are
/// byte-identical.
pub fn encode_with_created(
    workout: &WorkoutRecord,
    records: &[MergedRecord],
    config: &FitEncoderConfig,
    created: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let messages = build_message_set(workout, records, config, created)?;
    serialize_message_set(&messages)
}
