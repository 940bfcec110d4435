//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating and configuring event
//! repository instances based on runtime configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::{LocalRepository, QueryMode, SnapshotRepository};
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{EventRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory local repository
    Local,
    /// JSON document on disk
    Snapshot,
    /// Postgres + Diesel implementation
    Postgres,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string (`local`, `snapshot`/`json`,
    /// `postgres`/`pg`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "snapshot" | "json" => Ok(Self::Snapshot),
            "postgres" | "pg" => Ok(Self::Postgres),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variables.
    ///
    /// `REPOSITORY_TYPE` wins when set and valid. Otherwise a database URL
    /// selects Postgres, `SNAPSHOT_PATH` selects the snapshot store, and the
    /// fallback is Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            match val.parse() {
                Ok(repo_type) => return repo_type,
                Err(e) => log::warn!("{}; falling back to detection", e),
            }
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else if std::env::var("SNAPSHOT_PATH").is_ok() {
            Self::Snapshot
        } else {
            Self::Local
        }
    }
}

fn query_mode_from_env() -> RepositoryResult<QueryMode> {
    match std::env::var("REPOSITORY_QUERY_MODE") {
        Ok(val) => QueryMode::from_str(&val).map_err(RepositoryError::configuration),
        Err(_) => Ok(QueryMode::default()),
    }
}

fn snapshot_path_from_env() -> RepositoryResult<PathBuf> {
    std::env::var("SNAPSHOT_PATH")
        .map(PathBuf::from)
        .map_err(|_| RepositoryError::configuration("SNAPSHOT_PATH environment variable not set"))
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_disabled() -> RepositoryError {
    RepositoryError::configuration("Postgres repository feature not enabled")
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```
/// use hotspot_map::db::{EventRepository, RepositoryFactory};
///
/// let repo = RepositoryFactory::create_local();
/// assert_eq!(repo.name(), "local");
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// Snapshot repositories need `snapshot_path`; Postgres needs
    /// `postgres_config`.
    pub async fn create(
        repo_type: RepositoryType,
        snapshot_path: Option<&Path>,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn EventRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Snapshot => {
                let path = snapshot_path.ok_or_else(|| {
                    RepositoryError::configuration("Snapshot repository requires a path")
                })?;
                Ok(Self::create_snapshot(path))
            }
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        RepositoryError::configuration(
                            "Postgres repository requires PostgresConfig",
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as Arc<dyn EventRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = postgres_config;
                    Err(postgres_disabled())
                }
            }
        }
    }

    /// Create a Postgres repository.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let config = config.clone();
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Pool setup task failed: {}", e)))??;
        Ok(Arc::new(repo))
    }

    /// Create an in-memory local repository using geohash range queries.
    pub fn create_local() -> Arc<dyn EventRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create an in-memory local repository with an explicit query mode.
    pub fn create_local_with_mode(mode: QueryMode) -> Arc<dyn EventRepository> {
        Arc::new(LocalRepository::with_mode(mode))
    }

    /// Create a repository backed by a JSON snapshot file.
    pub fn create_snapshot(path: impl Into<PathBuf>) -> Arc<dyn EventRepository> {
        Arc::new(SnapshotRepository::new(path))
    }

    /// Create repository from environment configuration.
    ///
    /// See [`RepositoryType::from_env`] for the selection rules.
    pub async fn from_env() -> RepositoryResult<Arc<dyn EventRepository>> {
        RepositoryBuilder::new().from_env()?.build().await
    }

    /// Create repository from a TOML configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn EventRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from the default configuration file location.
    ///
    /// Searches for `hotspots.toml` in standard locations.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn EventRepository>> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from a RepositoryConfig instance.
    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn EventRepository>> {
        RepositoryBuilder::new()
            .apply_config(config)?
            .build()
            .await
    }
}

/// Builder for configuring repository creation.
///
/// # Example
/// ```no_run
/// use hotspot_map::db::{RepositoryBuilder, RepositoryType};
///
/// # async fn run() -> Result<(), hotspot_map::db::RepositoryError> {
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Snapshot)
///     .snapshot_path("data/events.json")
///     .build()
///     .await?;
/// # let _ = repo;
/// # Ok(())
/// # }
/// ```
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    query_mode: QueryMode,
    snapshot_path: Option<PathBuf>,
    #[cfg(feature = "postgres-repo")]
    postgres_config: Option<PostgresConfig>,
}

impl RepositoryBuilder {
    /// Create a new repository builder that defaults to an in-memory store.
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::Local,
            query_mode: QueryMode::default(),
            snapshot_path: None,
            #[cfg(feature = "postgres-repo")]
            postgres_config: None,
        }
    }

    /// Set the repository type.
    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    /// Set the query mode used by the local backend.
    pub fn query_mode(mut self, mode: QueryMode) -> Self {
        self.query_mode = mode;
        self
    }

    /// Set the snapshot file path.
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Set the Postgres configuration.
    #[cfg(feature = "postgres-repo")]
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> RepositoryResult<Self> {
        self.repo_type = RepositoryType::from_env();
        self.query_mode = query_mode_from_env()?;

        match self.repo_type {
            RepositoryType::Local => {}
            RepositoryType::Snapshot => {
                self.snapshot_path = Some(snapshot_path_from_env()?);
            }
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config =
                        PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
                    self.postgres_config = Some(config);
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    return Err(postgres_disabled());
                }
            }
        }

        Ok(self)
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(self, config_path: P) -> RepositoryResult<Self> {
        let repo_config = RepositoryConfig::from_file(config_path)?;
        self.apply_config(&repo_config)
    }

    /// Load configuration from the default location.
    pub fn from_default_config(self) -> RepositoryResult<Self> {
        let repo_config = RepositoryConfig::from_default_location()?;
        self.apply_config(&repo_config)
    }

    fn apply_config(mut self, repo_config: &RepositoryConfig) -> RepositoryResult<Self> {
        self.repo_type = repo_config
            .repository_type()
            .map_err(|e| RepositoryError::configuration(format!("Invalid repository type: {}", e)))?;
        self.query_mode = repo_config
            .query_mode()
            .map_err(|e| RepositoryError::configuration(format!("Invalid query mode: {}", e)))?;
        self.snapshot_path = repo_config.snapshot_path()?;

        if self.repo_type == RepositoryType::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                let config = repo_config.to_postgres_config()?.ok_or_else(|| {
                    RepositoryError::configuration(
                        "Postgres repository requires database configuration",
                    )
                })?;
                self.postgres_config = Some(config);
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(postgres_disabled());
            }
        }

        Ok(self)
    }

    /// Build the repository instance.
    pub async fn build(self) -> RepositoryResult<Arc<dyn EventRepository>> {
        match self.repo_type {
            RepositoryType::Local => Ok(RepositoryFactory::create_local_with_mode(self.query_mode)),
            RepositoryType::Snapshot => {
                RepositoryFactory::create(
                    RepositoryType::Snapshot,
                    self.snapshot_path.as_deref(),
                    None,
                )
                .await
            }
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    RepositoryFactory::create(
                        RepositoryType::Postgres,
                        None,
                        self.postgres_config.as_ref(),
                    )
                    .await
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(postgres_disabled())
                }
            }
        }
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
