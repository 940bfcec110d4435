//! # Hotspot Map Backend
//!
//! Clusters geolocated events into map hotspots.
//!
//! Events live in an external store behind the [`db::EventRepository`]
//! trait. Each refresh cycle fetches the events visible in the current
//! viewport and time window, drops out-of-range and stale ones, buckets the
//! rest into a zoom-dependent grid and publishes one styled hotspot per
//! occupied cell.
//!
//! ## Architecture
//!
//! - [`models`]: coordinates, viewports, events, hotspots, time windows
//! - [`services`]: aggregation, filtering and presentation, plus the refresh
//!   controller, debouncer and poller that drive them
//! - [`db`]: repository trait and backends, record normalization, view-state
//!   persistence
//! - [`config`]: server settings from the environment
//! - [`http`]: Axum REST API and SSE stream

// RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
