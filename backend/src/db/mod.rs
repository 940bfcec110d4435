//! Event storage for the hotspot map.
//!
//! This module provides abstractions for reading and appending events via
//! the Repository pattern, allowing different storage backends to be swapped
//! easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Refresh controller / REST API                          │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - query building, dedup, normalization, filtering      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Trait (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┼───────────────────┐
//!     │               │                   │
//! ┌───▼─────┐   ┌─────▼──────┐   ┌────────▼────────┐
//! │  Local  │   │  Snapshot  │   │    Postgres     │
//! │(memory) │   │  (JSON)    │   │ (Diesel, opt.)  │
//! └─────────┘   └────────────┘   └─────────────────┘
//! ```
//!
//! # Usage
//! ```
//! use hotspot_map::db::{EventRepository, RepositoryFactory};
//!
//! let repo = RepositoryFactory::create_local();
//! assert_eq!(repo.name(), "local");
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod records;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;
pub mod view_state;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use records::{normalize_record, RecordError};
pub use repo_config::RepositoryConfig;
pub use repositories::{LocalRepository, QueryMode, SnapshotRepository, UnavailableRepository};
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, EventQuery, EventRepository, RepositoryError, RepositoryResult,
};
pub use services::{add_test_event, fetch_visible_events, FetchStats};
pub use view_state::{FileViewStateStore, MemoryViewStateStore, ViewStateStore};
