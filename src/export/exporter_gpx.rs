//! GPX export functionality for workout data.
//!
//! Produces a GPX 1.1 document with one track segment and, where a heart
//! rate is known, the Garmin track-point extension on each trackpoint.

use crate::model::types::{ExportError, MergedRecord, WorkoutRecord};
use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// GPX XML namespaces
const NS_GPX: &str = "http://www.topografix.com/GPX/1/1";
const NS_TPX: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd http://www.garmin.com/xmlschemas/TrackPointExtension/v1 http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd";

const CREATOR: &str = "WorkoutExporter";

/// Export merged workout records to a GPX 1.1 document.
///
/// Route order is preserved exactly; no coordinate transform, no
/// down-sampling. Records with an unknown heart rate omit the extensions
/// block entirely.
pub fn export_gpx(workout: &WorkoutRecord, records: &[MergedRecord]) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    // XML declaration
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    // Root element
    let mut root = BytesStart::new("gpx");
    root.push_attribute(("creator", CREATOR));
    root.push_attribute(("version", "1.1"));
    root.push_attribute(("xmlns", NS_GPX));
    root.push_attribute(("xmlns:gpxtpx", NS_TPX));
    root.push_attribute(("xmlns:xsi", NS_XSI));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    // Metadata with workout start time
    writer
        .write_event(Event::Start(BytesStart::new("metadata")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;
    write_element(&mut writer, "time", &iso8601(&workout.start_time))?;
    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    // Track with a single segment
    writer
        .write_event(Event::Start(BytesStart::new("trk")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;
    write_element(&mut writer, "name", &workout.name())?;
    writer
        .write_event(Event::Start(BytesStart::new("trkseg")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    for record in records {
        write_trackpoint(&mut writer, record)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("trkseg")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("trk")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("gpx")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(|e| ExportError::XmlError(e.to_string()))
}

/// Write a single trackpoint with elevation, time and optional heart rate.
fn write_trackpoint<W: std::io::Write>(
    writer: &mut Writer<W>,
    record: &MergedRecord,
) -> Result<(), ExportError> {
    let mut trkpt = BytesStart::new("trkpt");
    trkpt.push_attribute(("lat", record.latitude.to_string().as_str()));
    trkpt.push_attribute(("lon", record.longitude.to_string().as_str()));
    writer
        .write_event(Event::Start(trkpt))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    // Elevation magnitude in meters
    write_element(writer, "ele", &record.altitude_meters.abs().to_string())?;

    // Time
    write_element(writer, "time", &iso8601(&record.timestamp))?;

    // Heart rate extension, only when a value is in effect
    if let Some(bpm) = record.heart_rate {
        write_heart_rate_extension(writer, bpm)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("trkpt")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    Ok(())
}

/// Write the Garmin track-point extension carrying the heart rate.
fn write_heart_rate_extension<W: std::io::Write>(
    writer: &mut Writer<W>,
    bpm: f64,
) -> Result<(), ExportError> {
    writer
        .write_event(Event::Start(BytesStart::new("extensions")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::Start(BytesStart::new("gpxtpx:TrackPointExtension")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    // bpm truncated toward zero
    write_element(writer, "gpxtpx:hr", &(bpm as i64).to_string())?;

    writer
        .write_event(Event::End(BytesEnd::new("gpxtpx:TrackPointExtension")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::End(BytesEnd::new("extensions")))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    Ok(())
}

/// Write a simple element with text content.
fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), ExportError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| ExportError::XmlError(e.to_string()))?;

    Ok(())
}

/// Strict ISO-8601 timestamp with a trailing Z.
fn iso8601(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
