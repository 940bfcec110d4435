//! JSON snapshot repository.
//!
//! Reads events from a JSON export of a realtime database: either an object
//! keyed by push id (`{"-Nabc": {...}, ...}`) or an array of records. Every
//! fetch is a full-table scan; range queries are not supported by the format,
//! so the caller's exact filter does all the work.
//!
//! Appends rewrite the whole file through a temporary file and a rename, so
//! readers never observe a half-written snapshot.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::repository::*;
use crate::models::{EventId, NewEvent, StoredEvent};
use crate::services::geohash::{self, STORED_PRECISION};

pub struct SnapshotRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new(operation)
            .with_entity("snapshot")
            .with_details(self.path.display().to_string())
    }

    async fn read_root(&self, operation: &str) -> RepositoryResult<Value> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepositoryError::ConnectionError {
                    message: "snapshot file not found".to_string(),
                    context: self.context(operation),
                }
            } else {
                RepositoryError::storage_with_context(e.to_string(), self.context(operation))
            }
        })?;

        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&content).map_err(|e| {
            RepositoryError::query_with_context(
                format!("snapshot is not valid JSON: {}", e),
                self.context(operation),
            )
        })
    }

    async fn write_root(&self, root: &Value) -> RepositoryResult<()> {
        let content = serde_json::to_string_pretty(root).map_err(|e| {
            RepositoryError::internal_with_context(e.to_string(), self.context("append_event"))
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(|e| {
            RepositoryError::storage_with_context(e.to_string(), self.context("append_event"))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RepositoryError::storage_with_context(e.to_string(), self.context("append_event"))
        })
    }
}

/// Flatten a snapshot root into stored events.
fn entries(root: Value) -> RepositoryResult<Vec<StoredEvent>> {
    match root {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(id, record)| StoredEvent::new(id, record))
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, record)| !record.is_null())
            .map(|(index, record)| {
                let id = record
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                StoredEvent::new(id, record)
            })
            .collect()),
        _ => Err(RepositoryError::query(
            "snapshot root must be an object or an array",
        )),
    }
}

#[async_trait]
impl EventRepository for SnapshotRepository {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn fetch_events(&self, _query: &EventQuery) -> RepositoryResult<Vec<StoredEvent>> {
        let root = self.read_root("fetch_events").await?;
        entries(root).map_err(|e| e.with_operation("fetch_events"))
    }

    async fn append_event(&self, event: NewEvent) -> RepositoryResult<StoredEvent> {
        validate_new_event(&event)?;
        let _guard = self.write_lock.lock().await;

        let root = match self.read_root("append_event").await {
            Ok(root) => root,
            Err(RepositoryError::ConnectionError { .. }) => Value::Null,
            Err(e) => return Err(e),
        };

        let id = EventId::new(Uuid::new_v4().simple().to_string());
        let hash = geohash::encode(event.position(), STORED_PRECISION);
        let mut record = event.to_record(Utc::now(), &hash);

        let root = match root {
            Value::Null => {
                let mut map = Map::new();
                map.insert(id.to_string(), record.clone());
                Value::Object(map)
            }
            Value::Object(mut map) => {
                map.insert(id.to_string(), record.clone());
                Value::Object(map)
            }
            Value::Array(mut items) => {
                if let Value::Object(obj) = &mut record {
                    obj.insert("id".to_string(), Value::String(id.to_string()));
                }
                items.push(record.clone());
                Value::Array(items)
            }
            _ => {
                return Err(RepositoryError::query_with_context(
                    "snapshot root must be an object or an array",
                    self.context("append_event"),
                ))
            }
        };

        self.write_root(&root).await?;
        Ok(StoredEvent::new(id, record))
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(tokio::fs::metadata(&self.path).await.is_ok())
    }
}
