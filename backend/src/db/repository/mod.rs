//! Repository trait definitions for the program schedule store.
//!
//! Two focused traits abstract the storage backend:
//!
//! - [`error`]: Error types for repository operations
//! - [`integrity`]: Read-only queries behind each integrity check
//! - [`programs`]: Program CRUD and table inspection used by loaders and tests
//!
//! For code that needs both, use the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn load_and_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
//!     repo.insert_program(Some("Morning News"), Some(six), Some(seven)).await?;
//!     Ok(repo.fetch_orphaned_interval_names().await?.is_empty())
//! }
//! ```

pub mod error;
pub mod integrity;
pub mod programs;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use integrity::IntegrityRepository;
pub use programs::ProgramRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements both traits.
pub trait FullRepository: IntegrityRepository + ProgramRepository {}

impl<T> FullRepository for T where T: IntegrityRepository + ProgramRepository {}
