//! Data Transfer Objects for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::models::{StoredEvent, TimeWindow, ViewState, ViewportBounds};
use crate::services::refresh::HotspotSnapshot;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Backend name (`local`, `snapshot`, `postgres`)
    pub repository: String,
    pub database: String,
}

/// Hotspot snapshot plus the state of the "add test event" action.
#[derive(Debug, Clone, Serialize)]
pub struct HotspotsResponse {
    #[serde(flatten)]
    pub snapshot: HotspotSnapshot,
    pub can_add_events: bool,
}

/// Viewport reported by the map after a move or zoom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportRequest {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: f64,
}

impl ViewportRequest {
    pub fn bounds(&self) -> ViewportBounds {
        ViewportBounds::new(self.north, self.south, self.east, self.west)
    }
}

/// Response for an accepted viewport update.
#[derive(Debug, Clone, Serialize)]
pub struct ViewportAccepted {
    pub view: ViewState,
    /// Delay before the debounced refresh runs
    pub refresh_in_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindowRequest {
    pub window: TimeWindow,
}

/// Optional body for `POST /v1/events/test`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TestEventRequest {
    /// Jitter radius in degrees
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestEventResponse {
    pub event: StoredEvent,
    pub hotspots: HotspotsResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewStateResponse {
    pub view: ViewState,
    pub window: TimeWindow,
    /// Rectangle used for queries, estimated when the map never reported one
    pub effective_bounds: ViewportBounds,
}
