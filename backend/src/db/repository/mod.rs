//! Repository trait for event stores.
//!
//! Every store the map can read from (in-memory, JSON snapshot, Postgres)
//! implements [`EventRepository`]. The aggregation and filtering core never
//! sees a backend directly; it receives records through this trait and
//! normalizes them at the boundary.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations

pub mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use crate::models::{NewEvent, StoredEvent, ViewportBounds};
use crate::services::geohash::GeohashRange;

/// Candidate selection for one fetch.
///
/// Backends use whatever subset of the query they can evaluate natively and
/// may return more than asked; callers always apply the exact filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Geohash prefix ranges. Empty means a full-table scan.
    pub ranges: Vec<GeohashRange>,
    /// Visible rectangle, for backends that can range on coordinates.
    pub bounds: Option<ViewportBounds>,
    /// Oldest timestamp of interest, for backends that index time.
    pub since: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn full_scan() -> Self {
        Self::default()
    }

    pub fn in_range(range: GeohashRange) -> Self {
        Self {
            ranges: vec![range],
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, bounds: ViewportBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn is_full_scan(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Read/append access to a remote event store.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Fetch candidate records. Implementations may over-select.
    async fn fetch_events(&self, query: &EventQuery) -> RepositoryResult<Vec<StoredEvent>>;

    /// Append a record. A missing timestamp is assigned by the store.
    async fn append_event(&self, event: NewEvent) -> RepositoryResult<StoredEvent>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}

/// Validate coordinates before writing them.
pub(crate) fn validate_new_event(event: &NewEvent) -> RepositoryResult<()> {
    if !event.position().is_valid() {
        return Err(RepositoryError::validation_with_context(
            format!(
                "invalid coordinate ({}, {})",
                event.latitude, event.longitude
            ),
            ErrorContext::new("append_event").with_entity("event"),
        ));
    }
    Ok(())
}
