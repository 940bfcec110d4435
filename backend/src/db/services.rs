//! Service layer for event fetching.
//!
//! These functions sit between the refresh controller and a repository. They
//! turn a viewport and window start into a repository query, normalize what
//! comes back, drop duplicates and apply the exact bounds/time filter.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

use super::records::normalize_record;
use super::repositories::QueryMode;
use super::repository::{EventQuery, EventRepository, RepositoryResult};
use crate::models::{EventId, LatLng, RawEvent, StoredEvent, ViewportBounds};
use crate::services::filtering::admits;
use crate::services::geohash::query_ranges;
use crate::services::test_events::jittered_event;

/// Counters for one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Records returned by the repository, duplicates included.
    pub fetched: usize,
    /// Records skipped because their id was already seen this cycle.
    pub duplicates: usize,
    /// Records that could not be normalized.
    pub malformed: usize,
    /// Valid events outside the viewport or time window.
    pub rejected: usize,
    /// Events handed to aggregation.
    pub admitted: usize,
}

/// Build the repository query for a viewport.
pub fn build_query(bounds: &ViewportBounds, start: DateTime<Utc>, mode: QueryMode) -> EventQuery {
    let query = match mode {
        QueryMode::GeohashRange => EventQuery {
            ranges: query_ranges(bounds),
            ..Default::default()
        },
        QueryMode::FullScan => EventQuery::full_scan(),
    };
    query.with_bounds(*bounds).since(start)
}

/// Fetch the events visible in `bounds` since `start`.
///
/// `seen` is cleared first and then filled with every id returned by the
/// repository, so an event that matches more than one geohash range is
/// counted once.
pub async fn fetch_visible_events(
    repo: &dyn EventRepository,
    bounds: &ViewportBounds,
    start: DateTime<Utc>,
    mode: QueryMode,
    seen: &mut HashSet<EventId>,
) -> RepositoryResult<(Vec<RawEvent>, FetchStats)> {
    let query = build_query(bounds, start, mode);
    let records = repo.fetch_events(&query).await?;
    let result = admit_records(records, bounds, start, seen);
    log::debug!(
        "{}: fetched {} records over {} ranges, admitted {}",
        repo.name(),
        result.1.fetched,
        query.ranges.len(),
        result.1.admitted
    );
    Ok(result)
}

/// Dedup, normalize and filter records already fetched.
pub fn admit_records(
    records: Vec<StoredEvent>,
    bounds: &ViewportBounds,
    start: DateTime<Utc>,
    seen: &mut HashSet<EventId>,
) -> (Vec<RawEvent>, FetchStats) {
    seen.clear();
    let mut stats = FetchStats {
        fetched: records.len(),
        ..Default::default()
    };
    let mut events = Vec::with_capacity(records.len());

    for stored in records {
        if !seen.insert(stored.id.clone()) {
            stats.duplicates += 1;
            continue;
        }
        let event = match normalize_record(&stored.record) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Skipping malformed event {}: {}", stored.id, e);
                stats.malformed += 1;
                continue;
            }
        };
        if admits(&event, bounds, start) {
            events.push(event);
        } else {
            stats.rejected += 1;
        }
    }

    stats.admitted = events.len();
    (events, stats)
}

/// Append one synthetic event near `center`.
pub async fn add_test_event<R: Rng + ?Sized>(
    repo: &dyn EventRepository,
    center: LatLng,
    radius_deg: f64,
    rng: &mut R,
) -> RepositoryResult<StoredEvent> {
    let event = jittered_event(center, radius_deg, rng);
    let stored = repo.append_event(event).await?;
    log::info!("Added test event {} via {}", stored.id, repo.name());
    Ok(stored)
}

/// Check repository health.
pub async fn health_check(repo: &dyn EventRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}
