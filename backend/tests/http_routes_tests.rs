//! HTTP API exercised through the router with `tower::ServiceExt::oneshot`.

#![cfg(feature = "http-server")]

mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use hotspot_map::db::{
    LocalRepository, MemoryViewStateStore, RepositoryError, UnavailableRepository,
};
use hotspot_map::http::{create_router, AppState};
use hotspot_map::models::TimeWindow;
use hotspot_map::services::{RefreshController, RefreshTrigger};

fn app(repo: LocalRepository) -> Router {
    let controller = support::controller_for(repo, TimeWindow::Today);
    create_router(AppState::new(controller, Duration::from_millis(300)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn madrid_viewport(zoom: f64) -> Value {
    json!({"north": 40.5, "south": 40.3, "east": -3.6, "west": -3.8, "zoom": zoom})
}

#[tokio::test]
async fn health_reports_backend() {
    let app = app(LocalRepository::new());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["repository"], "local");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn hotspots_start_empty() {
    let app = app(support::madrid_repo(3));
    let (status, body) = send(&app, Method::GET, "/v1/hotspots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 0);
    assert_eq!(body["hotspots"].as_array().unwrap().len(), 0);
    assert_eq!(body["can_add_events"], true);
}

#[tokio::test(start_paused = true)]
async fn viewport_update_is_debounced() {
    let app = app(support::madrid_repo(12));

    let (status, body) = send(&app, Method::POST, "/v1/viewport", Some(madrid_viewport(12.0))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["refresh_in_ms"], 300);

    let (_, before) = send(&app, Method::GET, "/v1/hotspots", None).await;
    assert_eq!(before["generation"], 0);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let (_, after) = send(&app, Method::GET, "/v1/hotspots", None).await;
    assert_eq!(after["generation"], 1);
    assert_eq!(after["trigger"], "viewport_changed");
    let hotspots = after["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["count"], 12);
    assert_eq!(hotspots[0]["color"], "orange");
}

#[tokio::test]
async fn invalid_viewport_is_rejected() {
    let app = app(LocalRepository::new());
    let inverted = json!({"north": -1.0, "south": 1.0, "east": 1.0, "west": -1.0, "zoom": 10.0});
    let (status, body) = send(&app, Method::POST, "/v1/viewport", Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let antimeridian = json!({"north": 1.0, "south": -1.0, "east": -179.0, "west": 179.0, "zoom": 10.0});
    let (status, _) = send(&app, Method::POST, "/v1/viewport", Some(antimeridian)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_refresh_and_time_window() {
    let app = app(support::madrid_repo(4));
    send(&app, Method::POST, "/v1/viewport", Some(madrid_viewport(12.0))).await;

    let (status, body) = send(&app, Method::POST, "/v1/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trigger"], "manual");
    assert_eq!(body["hotspots"][0]["color"], "yellow");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/v1/time-window",
        Some(json!({"window": "last_hour"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["window"], "last_hour");
    assert_eq!(body["hotspots"][0]["count"], 4);

    let (status, body) =
        send(&app, Method::PUT, "/v1/time-window", Some(json!({"window": "week"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn add_test_event_appends_and_refreshes() {
    let app = app(LocalRepository::new());
    send(&app, Method::POST, "/v1/viewport", Some(madrid_viewport(14.0))).await;

    let (status, body) = send(&app, Method::POST, "/v1/events/test", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["event"]["id"].is_string());
    assert_eq!(body["hotspots"]["trigger"], "test_event");
    assert_eq!(body["hotspots"]["hotspots"][0]["count"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/events/test",
        Some(json!({"radius": 0.0001})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/events/test",
        Some(json!({"radius": 1e308})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn add_test_event_disabled_after_failed_refresh() {
    let repo = LocalRepository::new();
    let handle = repo.clone();
    let app = app(repo);

    handle.set_healthy(false);
    let (status, body) = send(&app, Method::POST, "/v1/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_string());
    assert_eq!(body["can_add_events"], false);

    let (status, body) = send(&app, Method::POST, "/v1/events/test", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn view_state_reflects_last_viewport() {
    let app = app(LocalRepository::new());
    send(&app, Method::POST, "/v1/viewport", Some(madrid_viewport(13.0))).await;

    let (status, body) = send(&app, Method::GET, "/v1/view-state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["zoom"], 13.0);
    let center_lat = body["view"]["center"]["latitude"].as_f64().unwrap();
    assert!((center_lat - 40.4).abs() < 1e-9);
    assert_eq!(body["window"], "today");
    assert_eq!(body["effective_bounds"]["north"], 40.5);
}

#[tokio::test]
async fn stream_starts_with_current_snapshot() {
    let app = app(support::madrid_repo(1));
    let response = app
        .clone()
        .oneshot(
            Request::get("/v1/hotspots/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: snapshot"));
    assert!(text.contains("\"generation\":0"));
}

#[tokio::test]
async fn unreachable_store_serves_degraded_api() {
    let repo = UnavailableRepository::from_error(&RepositoryError::connection(
        "connection refused (localhost:5432)",
    ));
    let controller = Arc::new(RefreshController::new(
        Arc::new(repo),
        Arc::new(MemoryViewStateStore::new()),
        TimeWindow::Today,
    ));
    assert!(!controller.check_health().await);
    controller.refresh(RefreshTrigger::Manual).await;
    let app = create_router(AppState::new(controller, Duration::from_millis(300)));

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repository"], "unavailable");
    assert_eq!(body["database"], "disconnected");

    let (status, body) = send(&app, Method::GET, "/v1/hotspots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hotspots"].as_array().unwrap().len(), 0);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
    assert_eq!(body["can_add_events"], false);

    let (status, body) = send(&app, Method::POST, "/v1/events/test", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UNAVAILABLE");
}
