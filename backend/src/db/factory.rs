//! Runtime selection of the program store backend.
//!
//! The validator only needs an `Arc<dyn FullRepository>`; which store sits
//! behind it is chosen from `REPOSITORY_TYPE`/`DATABASE_URL`, from a
//! `repository.toml`, or explicitly through [`RepositoryBuilder`].

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
#[cfg(feature = "postgres-repo")]
use super::repository::ErrorContext;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Live `programs`/`program_intervals` tables over Diesel
    Postgres,
    /// In-memory store with the interval trigger emulated
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Accepts `postgres`, `pg` or `local`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// `REPOSITORY_TYPE` if set, else Postgres when a database URL is present.
    ///
    /// An unparsable `REPOSITORY_TYPE` falls back to the local store with a warning.
    pub fn from_env() -> Self {
        match std::env::var("REPOSITORY_TYPE") {
            Ok(val) => val.parse().unwrap_or_else(|e| {
                log::warn!("{}; falling back to local repository", e);
                Self::Local
            }),
            Err(_) if database_url_is_set() => Self::Postgres,
            Err(_) => Self::Local,
        }
    }
}

fn database_url_is_set() -> bool {
    ["DATABASE_URL", "PG_DATABASE_URL"]
        .iter()
        .any(|key| std::env::var_os(key).is_some())
}

pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Open a store of `repo_type`. Postgres needs `postgres_config`.
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => Self::open_postgres(postgres_config).await,
        }
    }

    /// Pool construction opens connections, so it runs on the blocking pool.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let config = config.clone();
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| {
                RepositoryError::internal(
                    format!("Task join error: {}", e),
                    ErrorContext::new("create_postgres"),
                )
            })??;
        log::info!("Connected to Postgres program store");
        Ok(Arc::new(repo))
    }

    #[cfg(feature = "postgres-repo")]
    async fn open_postgres(
        config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = config.ok_or_else(|| {
            RepositoryError::configuration("Postgres repository requires PostgresConfig")
        })?;
        let repo: Arc<dyn FullRepository> = Self::create_postgres(config).await?;
        Ok(repo)
    }

    #[cfg(not(feature = "postgres-repo"))]
    async fn open_postgres(
        _config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }

    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Store selected by [`RepositoryType::from_env`], pool settings from `PG_*`.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        RepositoryBuilder::new().with_env()?.build().await
    }

    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Uses the file named by `INTEGRITY_CONFIG` or the first `repository.toml` found.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config).await
    }

    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        RepositoryBuilder::new()
            .with_repository_config(config)?
            .build()
            .await
    }
}

/// Collects a store choice before opening it.
///
/// ```ignore
/// use tv_intervals::db::{RepositoryBuilder, RepositoryType};
///
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Local)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    postgres_config: Option<PostgresConfig>,
}

impl RepositoryBuilder {
    /// Starts from [`RepositoryType::from_env`] with no pool settings.
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            postgres_config: None,
        }
    }

    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Re-read the store type from the environment and, for Postgres, the `PG_*` pool settings.
    pub fn with_env(mut self) -> RepositoryResult<Self> {
        self.repo_type = RepositoryType::from_env();
        if self.repo_type == RepositoryType::Postgres {
            self.postgres_config = Some(postgres_config_from_env()?);
        }
        Ok(self)
    }

    pub fn with_config_file<P: AsRef<Path>>(self, config_path: P) -> RepositoryResult<Self> {
        self.with_repository_config(&RepositoryConfig::from_file(config_path)?)
    }

    pub fn with_repository_config(mut self, config: &RepositoryConfig) -> RepositoryResult<Self> {
        self.repo_type = config.repository_type()?;
        self.postgres_config = config.to_postgres_config()?;
        Ok(self)
    }

    pub async fn build(self) -> RepositoryResult<Arc<dyn FullRepository>> {
        log::debug!("Opening {:?} program store", self.repo_type);
        RepositoryFactory::create(self.repo_type, self.postgres_config.as_ref()).await
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "postgres-repo")]
fn postgres_config_from_env() -> RepositoryResult<PostgresConfig> {
    PostgresConfig::from_env().map_err(RepositoryError::configuration)
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_config_from_env() -> RepositoryResult<PostgresConfig> {
    Err(RepositoryError::configuration(
        "Postgres repository feature not enabled",
    ))
}
