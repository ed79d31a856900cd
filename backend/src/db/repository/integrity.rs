//! Read-only queries backing the data-integrity checks.
//!
//! Each method corresponds to exactly one read against the `programs` /
//! `program_intervals` dataset and returns typed rows. Implementations must not
//! mutate the dataset and must not fail on malformed rows: nulls and odd values
//! are returned as data so the validator can report them.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    DuplicateName, ExcessiveDuration, IntervalMismatch, LongName, OverlappingPair, ProgramTimes,
};

/// Query handle consumed by [`crate::services::integrity::IntegrityValidator`].
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait IntegrityRepository: Send + Sync {
    /// Names in `program_intervals` with no matching row in `programs`.
    async fn fetch_orphaned_interval_names(&self) -> RepositoryResult<Vec<String>>;

    /// Names in `programs` with no matching row in `program_intervals`.
    ///
    /// A null name never has an interval row, so it is always reported.
    async fn fetch_programs_missing_intervals(&self) -> RepositoryResult<Vec<Option<String>>>;

    /// Programs whose start or end time is null or empty.
    async fn fetch_programs_with_invalid_times(&self) -> RepositoryResult<Vec<ProgramTimes>>;

    /// Pairs of distinct programs whose schedules intersect linearly.
    ///
    /// Each pair is reported once, ordered by program id. Pairs involving a
    /// program that wraps midnight are excluded.
    async fn fetch_overlapping_programs(&self) -> RepositoryResult<Vec<OverlappingPair>>;

    /// Programs ending before they start that do not look like overnight shows.
    async fn fetch_negative_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>>;

    /// Programs whose stored interval count differs from the recomputed one.
    async fn fetch_interval_mismatches(&self) -> RepositoryResult<Vec<IntervalMismatch>>;

    /// Program names used by more than one row.
    async fn fetch_duplicate_names(&self) -> RepositoryResult<Vec<DuplicateName>>;

    /// Programs with a null, empty or whitespace-only name.
    async fn fetch_programs_with_empty_names(&self) -> RepositoryResult<Vec<ProgramTimes>>;

    /// Program names longer than 255 characters.
    async fn fetch_long_names(&self) -> RepositoryResult<Vec<LongName>>;

    /// Programs whose start equals their end.
    async fn fetch_zero_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>>;

    /// Programs lasting more than 24 hours once overnight wraparound is applied.
    async fn fetch_programs_exceeding_day(&self) -> RepositoryResult<Vec<ExcessiveDuration>>;

    /// Program names containing a denylisted keyword-like substring.
    async fn fetch_suspicious_names(&self) -> RepositoryResult<Vec<String>>;

    /// Programs starting or ending off the quarter hour.
    async fn fetch_non_standard_time_programs(&self) -> RepositoryResult<Vec<ProgramTimes>>;
}
