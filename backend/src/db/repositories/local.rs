//! In-memory event repository.
//!
//! Suitable for unit tests and local development. Records are kept in their
//! stored shape together with the geohash they were indexed under, so the
//! repository can answer geohash range queries the same way a document store
//! with a geohash index would, including the over-selection.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::records::normalize_record;
use crate::db::repository::*;
use crate::models::{EventId, NewEvent, StoredEvent};
use crate::services::geohash::{self, STORED_PRECISION};

/// How the local repository answers [`EventQuery`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// Honour the query's geohash ranges, one index scan per range.
    #[default]
    GeohashRange,
    /// Ignore ranges and return every record.
    FullScan,
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "geohash" | "geohash_range" => Ok(Self::GeohashRange),
            "full_scan" | "scan" => Ok(Self::FullScan),
            _ => Err(format!("Unknown query mode: {}", s)),
        }
    }
}

/// In-memory local repository.
///
/// # Example
/// ```
/// use hotspot_map::db::repositories::LocalRepository;
/// use serde_json::json;
///
/// let repo = LocalRepository::new();
/// repo.insert_record("a", json!({"lat": 1.0, "lng": 2.0, "timestamp": 0}));
/// assert_eq!(repo.event_count(), 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    mode: QueryMode,
}

struct LocalData {
    // Ordered by (geohash, id) to mirror an index scan
    records: BTreeMap<(String, EventId), Value>,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty repository answering geohash range queries.
    pub fn new() -> Self {
        Self::with_mode(QueryMode::GeohashRange)
    }

    pub fn with_mode(mode: QueryMode) -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
            mode,
        }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Insert a record in any supported shape.
    ///
    /// Records whose coordinates cannot be read are stored under an empty
    /// geohash: full scans still return them, range queries never do.
    /// Inserting an existing id replaces that record, wherever it was indexed.
    pub fn insert_record(&self, id: impl Into<EventId>, record: Value) {
        let id = id.into();
        let hash = normalize_record(&record)
            .map(|event| geohash::encode(event.position(), STORED_PRECISION))
            .unwrap_or_default();
        let mut data = self.data.write();
        data.records.retain(|(_, existing), _| *existing != id);
        data.records.insert((hash, id), record);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all records, keeping the health flag.
    pub fn clear(&self) {
        self.data.write().records.clear();
    }

    /// Number of stored records.
    pub fn event_count(&self) -> usize {
        self.data.read().records.len()
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.data.read().is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "local repository is marked unavailable",
                ErrorContext::new(operation),
            ))
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventRepository for LocalRepository {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn fetch_events(&self, query: &EventQuery) -> RepositoryResult<Vec<StoredEvent>> {
        self.ensure_healthy("fetch_events")?;
        let data = self.data.read();

        if self.mode == QueryMode::FullScan || query.is_full_scan() {
            return Ok(data
                .records
                .iter()
                .map(|((_, id), record)| StoredEvent::new(id.clone(), record.clone()))
                .collect());
        }

        let mut events = Vec::new();
        for range in &query.ranges {
            let lower = (range.start.clone(), EventId::new(""));
            events.extend(
                data.records
                    .range(lower..)
                    .take_while(|((hash, _), _)| hash.as_str() <= range.end.as_str())
                    .filter(|((hash, _), _)| !hash.is_empty())
                    .map(|((_, id), record)| StoredEvent::new(id.clone(), record.clone())),
            );
        }
        Ok(events)
    }

    async fn append_event(&self, event: NewEvent) -> RepositoryResult<StoredEvent> {
        self.ensure_healthy("append_event")?;
        validate_new_event(&event)?;

        let id = EventId::new(Uuid::new_v4().to_string());
        let hash = geohash::encode(event.position(), STORED_PRECISION);
        let record = event.to_record(Utc::now(), &hash);
        self.data
            .write()
            .records
            .insert((hash, id.clone()), record.clone());
        Ok(StoredEvent::new(id, record))
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }
}
