//! Normalization of stored records into [`RawEvent`]s.
//!
//! Stores disagree on field names and timestamp encodings: `lat`/`lng`,
//! `lat`/`lon`, `latitude`/`longitude`; RFC 3339 strings, epoch seconds,
//! epoch milliseconds (as numbers or strings), and server-timestamp objects
//! of the form `{ "seconds": s, "nanoseconds": n }`. Everything is converted
//! here, at the boundary, so the rest of the crate only deals with
//! [`RawEvent`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{LatLng, RawEvent};

const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "long", "longitude"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "createdAt", "time"];

/// Epoch values above this magnitude are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Why a record was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a finite number: {value}")]
    NotANumber { field: String, value: String },
    #[error("coordinate ({latitude}, {longitude}) is outside WGS84 ranges")]
    OutOfRange { latitude: f64, longitude: f64 },
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),
}

/// Convert one stored record into a [`RawEvent`].
pub fn normalize_record(record: &Value) -> Result<RawEvent, RecordError> {
    let obj = record.as_object().ok_or(RecordError::NotAnObject)?;

    let latitude = number_field(obj, LAT_KEYS, "lat")?;
    let longitude = number_field(obj, LNG_KEYS, "lng")?;
    if !LatLng::new(latitude, longitude).is_valid() {
        return Err(RecordError::OutOfRange {
            latitude,
            longitude,
        });
    }

    let (_, raw_timestamp) =
        first_field(obj, TIMESTAMP_KEYS).ok_or(RecordError::MissingField("timestamp"))?;
    let timestamp = parse_timestamp(raw_timestamp)?;

    Ok(RawEvent::new(latitude, longitude, timestamp))
}

fn first_field<'a>(obj: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn number_field(
    obj: &Map<String, Value>,
    keys: &[&'static str],
    canonical: &'static str,
) -> Result<f64, RecordError> {
    let (key, value) = first_field(obj, keys).ok_or(RecordError::MissingField(canonical))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(RecordError::NotANumber {
            field: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse any of the accepted timestamp encodings.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, RecordError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch)
            .ok_or_else(|| RecordError::BadTimestamp(n.to_string())),
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64);
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            seconds
                .and_then(|s| DateTime::from_timestamp(s, u32::try_from(nanos).ok()?))
                .ok_or_else(|| RecordError::BadTimestamp(value.to_string()))
        }
        other => Err(RecordError::BadTimestamp(other.to_string())),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(dt) = s.parse::<f64>().ok().and_then(from_epoch) {
        return Ok(dt);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(RecordError::BadTimestamp(s.to_string()))
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let seconds = if value.abs() > EPOCH_MILLIS_THRESHOLD {
        value / 1000.0
    } else {
        value
    };
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
