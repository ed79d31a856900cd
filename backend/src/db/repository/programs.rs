//! Program store trait.
//!
//! Write operations mirror what the schedule loaders and test fixtures do.
//! In Postgres, `program_intervals` follows `programs` through a trigger; other
//! backends must reproduce that effect on every write.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Program, ProgramId, ProgramInterval, TimeOfDay};

/// Repository trait for program rows and their derived interval rows.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// Check if the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Insert a program row.
    ///
    /// Columns are nullable so that corrupted fixtures can be expressed.
    ///
    /// # Returns
    /// * `Ok(ProgramId)` - Id assigned to the new row
    /// * `Err(RepositoryError)` - If the insert fails
    async fn insert_program(
        &self,
        program_name: Option<&str>,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
    ) -> RepositoryResult<ProgramId>;

    /// Change the schedule of every program named `program_name`.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of rows updated
    async fn update_program_times(
        &self,
        program_name: &str,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> RepositoryResult<u64>;

    /// Rename every program named `old_name`.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of rows renamed
    async fn rename_program(&self, old_name: &str, new_name: &str) -> RepositoryResult<u64>;

    /// Delete every program named `program_name`.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of rows deleted
    async fn delete_program(&self, program_name: &str) -> RepositoryResult<u64>;

    /// All programs ordered by name, then id.
    async fn list_programs(&self) -> RepositoryResult<Vec<Program>>;

    /// All interval rows ordered by name.
    async fn list_program_intervals(&self) -> RepositoryResult<Vec<ProgramInterval>>;

    /// Interval rows for one program name.
    async fn get_program_interval(
        &self,
        program_name: &str,
    ) -> RepositoryResult<Vec<ProgramInterval>>;

    /// Remove every interval row and program row.
    async fn clear_programs(&self) -> RepositoryResult<()>;
}
