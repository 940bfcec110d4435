use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde_json::json;

use super::schema::hotspot_events;
use crate::models::StoredEvent;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = hotspot_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub event_id: String,
    pub lat: f64,
    pub lng: f64,
    pub geohash: String,
    pub recorded_at: DateTime<Utc>,
}

impl EventRow {
    /// Render the row in the canonical record shape.
    pub fn into_stored(self) -> StoredEvent {
        StoredEvent::new(
            self.event_id,
            json!({
                "lat": self.lat,
                "lng": self.lng,
                "geohash": self.geohash,
                "timestamp": self.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        )
    }
}

/// `recorded_at = None` inserts `DEFAULT`, i.e. the server's `now()`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = hotspot_events)]
pub struct NewEventRow {
    pub event_id: String,
    pub lat: f64,
    pub lng: f64,
    pub geohash: String,
    pub recorded_at: Option<DateTime<Utc>>,
}
