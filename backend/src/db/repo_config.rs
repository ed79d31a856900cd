//! `repository.toml` support.
//!
//! ```toml
//! [repository]
//! type = "postgres"          # or "local"
//!
//! [postgres]
//! database_url = "postgres://tv@localhost/schedule"
//! max_connections = 10
//! run_migrations = false
//! ```
//!
//! Every `[postgres]` key except `database_url` is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::factory::RepositoryType;
use super::repository::{RepositoryError, RepositoryResult};
use crate::db::PostgresConfig;

/// Environment variable pointing at an explicit `repository.toml`.
pub const CONFIG_PATH_ENV: &str = "INTEGRITY_CONFIG";

const SEARCH_PATHS: [&str; 3] = [
    "repository.toml",
    "backend/repository.toml",
    "../repository.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub repository: RepositorySection,
    #[serde(default)]
    pub postgres: PostgresSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// `[postgres]` table. Key names follow the pool settings, not `PostgresConfig` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostgresSection {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub run_migrations: bool,
}

impl Default for PostgresSection {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            idle_timeout: 600,
            max_retries: 3,
            retry_delay_ms: 100,
            run_migrations: false,
        }
    }
}

/// Path of the configuration file to use, if any.
///
/// `INTEGRITY_CONFIG` wins even when the file it names does not exist, so a
/// typo surfaces as a read error instead of a silent fallback.
pub fn locate() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }
    SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

impl RepositoryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        log::debug!("Read repository configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> RepositoryResult<Self> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load the file [`locate`] finds.
    pub fn from_default_location() -> RepositoryResult<Self> {
        let path = locate().ok_or_else(|| {
            RepositoryError::configuration(format!(
                "No repository.toml found (set {} or create one in {})",
                CONFIG_PATH_ENV,
                SEARCH_PATHS.join(", ")
            ))
        })?;
        Self::from_file(path)
    }

    pub fn repository_type(&self) -> RepositoryResult<RepositoryType> {
        self.repository.repo_type.parse().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })
    }

    /// Pool settings when the file selects Postgres, `None` for the local store.
    pub fn to_postgres_config(&self) -> RepositoryResult<Option<PostgresConfig>> {
        if self.repository_type()? == RepositoryType::Local {
            return Ok(None);
        }
        if self.postgres.database_url.trim().is_empty() {
            return Err(RepositoryError::configuration(
                "Postgres repository requires 'postgres.database_url' setting",
            ));
        }
        self.postgres.to_pool_config().map(Some)
    }
}

impl PostgresSection {
    #[cfg(feature = "postgres-repo")]
    fn to_pool_config(&self) -> RepositoryResult<PostgresConfig> {
        Ok(PostgresConfig {
            database_url: self.database_url.clone(),
            max_pool_size: self.max_connections,
            min_pool_size: self.min_connections,
            connection_timeout_sec: self.connect_timeout,
            idle_timeout_sec: self.idle_timeout,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            run_migrations: self.run_migrations,
        })
    }

    #[cfg(not(feature = "postgres-repo"))]
    fn to_pool_config(&self) -> RepositoryResult<PostgresConfig> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }
}
