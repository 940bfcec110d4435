//! Stand-in for a backend that could not be built at startup.
//!
//! Every call fails with a connection error, so the refresh controller
//! publishes an error snapshot with no hotspots and keeps adding disabled.
//! The process stays up and keeps serving the API.

use async_trait::async_trait;

use crate::db::repository::*;
use crate::models::{NewEvent, StoredEvent};

#[derive(Debug, Clone)]
pub struct UnavailableRepository {
    reason: String,
}

impl UnavailableRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Wrap a factory error.
    pub fn from_error(err: &RepositoryError) -> Self {
        Self::new(err.to_string())
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn unavailable(&self, operation: &str) -> RepositoryError {
        RepositoryError::connection_with_context(
            format!("event store unavailable: {}", self.reason),
            ErrorContext::new(operation),
        )
    }
}

#[async_trait]
impl EventRepository for UnavailableRepository {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn fetch_events(&self, _query: &EventQuery) -> RepositoryResult<Vec<StoredEvent>> {
        Err(self.unavailable("fetch_events"))
    }

    async fn append_event(&self, _event: NewEvent) -> RepositoryResult<StoredEvent> {
        Err(self.unavailable("append_event"))
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(false)
    }
}
