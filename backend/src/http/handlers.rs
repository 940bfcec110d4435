//! HTTP handlers for the REST API.
//!
//! Handlers are thin: they validate input, call the refresh controller and
//! wrap its snapshot for the client.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    HealthResponse, HotspotsResponse, TestEventRequest, TestEventResponse, TimeWindowRequest,
    ViewStateResponse, ViewportAccepted, ViewportRequest,
};
use super::error::AppError;
use super::extract::ApiJson;
use super::state::AppState;
use crate::db::services as db_services;
use crate::services::refresh::{HotspotSnapshot, RefreshTrigger};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn hotspots_response(state: &AppState, snapshot: HotspotSnapshot) -> HotspotsResponse {
    HotspotsResponse {
        snapshot,
        can_add_events: state.controller.can_add_events(),
    }
}

fn snapshot_event(response: &HotspotsResponse) -> Event {
    Event::default()
        .event("snapshot")
        .id(response.snapshot.generation.to_string())
        .data(serde_json::to_string(response).unwrap_or_default())
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let repository = state.repository();
    let db_status = match db_services::health_check(repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        repository: repository.name().to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Hotspots
// =============================================================================

/// GET /v1/hotspots
///
/// Latest snapshot. Does not trigger a fetch.
pub async fn get_hotspots(State(state): State<AppState>) -> HandlerResult<HotspotsResponse> {
    let snapshot = state.controller.snapshot();
    Ok(Json(hotspots_response(&state, snapshot)))
}

/// GET /v1/hotspots/stream
///
/// Server-Sent Events: the current snapshot first, then one event per
/// published refresh.
pub async fn stream_hotspots(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.controller.subscribe();
    let stream = async_stream::stream! {
        let current = rx.borrow_and_update().clone();
        yield Ok(snapshot_event(&hotspots_response(&state, current)));

        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            yield Ok(snapshot_event(&hotspots_response(&state, snapshot)));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// POST /v1/refresh
pub async fn refresh(State(state): State<AppState>) -> HandlerResult<HotspotsResponse> {
    let snapshot = state.controller.refresh(RefreshTrigger::Manual).await;
    Ok(Json(hotspots_response(&state, snapshot)))
}

// =============================================================================
// View
// =============================================================================

/// POST /v1/viewport
///
/// Stores the viewport and schedules a debounced refresh. Returns 202.
pub async fn update_viewport(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ViewportRequest>,
) -> Result<(StatusCode, Json<ViewportAccepted>), AppError> {
    let view = state.controller.set_viewport(request.bounds(), request.zoom)?;

    let controller = state.controller.clone();
    state.debouncer.schedule(async move {
        controller.refresh(RefreshTrigger::ViewportChanged).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ViewportAccepted {
            view,
            refresh_in_ms: state.debouncer.delay().as_millis() as u64,
        }),
    ))
}

/// PUT /v1/time-window
pub async fn set_time_window(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TimeWindowRequest>,
) -> HandlerResult<HotspotsResponse> {
    let snapshot = state.controller.set_time_window(request.window).await;
    Ok(Json(hotspots_response(&state, snapshot)))
}

/// GET /v1/view-state
pub async fn get_view_state(State(state): State<AppState>) -> HandlerResult<ViewStateResponse> {
    let view = state.controller.view_state();
    Ok(Json(ViewStateResponse {
        view,
        window: state.controller.time_window(),
        effective_bounds: view.effective_bounds(),
    }))
}

// =============================================================================
// Test events
// =============================================================================

/// POST /v1/events/test
///
/// Appends a jittered event around the view center and refreshes. The body
/// is optional.
pub async fn add_test_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TestEventResponse>), AppError> {
    let request: TestEventRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TestEventRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    if !state.controller.can_add_events() {
        return Err(AppError::Unavailable(
            "Adding events is disabled while the event store is unavailable".to_string(),
        ));
    }

    let (event, snapshot) = state.controller.add_test_event(request.radius).await?;
    Ok((
        StatusCode::CREATED,
        Json(TestEventResponse {
            event,
            hotspots: hotspots_response(&state, snapshot),
        }),
    ))
}
