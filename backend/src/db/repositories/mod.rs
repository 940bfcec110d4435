//! Event repository implementations.
//!
//! - `local`: in-memory store with geohash range or full-scan queries
//! - `snapshot`: JSON export file, full-table scan
//! - `postgres`: PostgreSQL with Diesel ORM, geohash range queries
//! - `unavailable`: placeholder for a backend that failed to start
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;
pub mod snapshot;
pub mod unavailable;

pub use local::{LocalRepository, QueryMode};
#[cfg(feature = "postgres-repo")]
pub use postgres::{PostgresConfig, PostgresRepository};
pub use snapshot::SnapshotRepository;
pub use unavailable::UnavailableRepository;
