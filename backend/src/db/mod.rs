//! Storage layer for the program schedule dataset.
//!
//! Follows the repository pattern: the integrity validator and the binary only
//! see the traits in [`repository`], and a concrete backend is chosen at runtime
//! through [`factory`].
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  integrity-check binary / tests              │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │  services::integrity::IntegrityValidator     │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │  IntegrityRepository + ProgramRepository     │
//! └─────────┬───────────────────────┬────────────┘
//!           │                       │
//!   ┌───────▼────────┐     ┌────────▼─────────┐
//!   │ PostgresRepo   │     │ LocalRepository  │
//!   │ (diesel, r2d2) │     │ (in-memory)      │
//!   └────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//! ```ignore
//! use tv_intervals::db::RepositoryFactory;
//! use tv_intervals::services::IntegrityValidator;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = RepositoryFactory::from_env().await?;
//!     let validator = IntegrityValidator::new(repo);
//!     let run = validator.run_comprehensive_validation().await?;
//!     println!("{}", run.overall_valid);
//!     Ok(())
//! }
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, FullRepository, IntegrityRepository, ProgramRepository, RepositoryError,
    RepositoryResult,
};
