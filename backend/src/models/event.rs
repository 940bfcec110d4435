//! Event records as they travel from the store to the aggregator.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::geo::LatLng;
use crate::define_key_type;

define_key_type!(EventId);

/// A normalized event: a position and the instant it was recorded.
///
/// Written by a source outside this system; read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl RawEvent {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// A record exactly as a backend returned it, keyed by its store id.
///
/// The record shape differs between stores (`lat`/`lng` vs `lat`/`lon`,
/// string or numeric timestamps); see [`crate::db::records`] for the
/// normalization applied at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
    pub record: Value,
}

impl StoredEvent {
    pub fn new(id: impl Into<EventId>, record: Value) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }
}

/// An event to append to the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub latitude: f64,
    pub longitude: f64,
    /// `None` lets the backend assign the timestamp when it writes the record.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn at(position: LatLng) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Render the canonical stored record, stamping `server_time` when the
    /// event carries no timestamp of its own.
    pub fn to_record(&self, server_time: DateTime<Utc>, geohash: &str) -> Value {
        let timestamp = self.timestamp.unwrap_or(server_time);
        json!({
            "lat": self.latitude,
            "lng": self.longitude,
            "geohash": geohash,
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}
