//! In-memory local repository implementation.
//!
//! Stores `programs` and `program_intervals` in memory and answers every
//! integrity query with the same predicates the Postgres queries express in
//! SQL (see [`crate::services::rules`]). Writes through [`ProgramRepository`]
//! keep the interval table in step the way the database trigger does; the raw
//! `*_row` helpers bypass that so tests can build corrupted datasets.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    DuplicateName, ExcessiveDuration, IntervalMismatch, LongName, OverlappingPair, Program,
    ProgramId, ProgramInterval, ProgramTimes, TimeOfDay,
};
use crate::services::intervals::{count_15min_intervals, wrapped_duration};
use crate::services::rules;

/// In-memory local repository.
///
/// # Example
/// ```
/// use tv_intervals::db::repositories::LocalRepository;
/// use tv_intervals::db::repository::ProgramRepository;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let repo = LocalRepository::new();
/// repo.insert_program(Some("Morning News"), "06:00".parse().ok(), "07:30".parse().ok())
///     .await
///     .unwrap();
///
/// let intervals = repo.get_program_interval("Morning News").await.unwrap();
/// assert_eq!(intervals[0].interval_count, 6);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    /// Ordered by id.
    programs: Vec<Program>,
    intervals: BTreeMap<String, i32>,
    next_program_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            programs: Vec::new(),
            intervals: BTreeMap::new(),
            next_program_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn push_program(
        &mut self,
        program_name: Option<&str>,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
    ) -> ProgramId {
        let id = ProgramId(self.next_program_id);
        self.next_program_id += 1;
        self.programs.push(Program {
            id,
            program_name: program_name.map(str::to_string),
            start_time,
            end_time,
        });
        id
    }

    /// Trigger emulation: recompute the interval row for a program row.
    ///
    /// Rows missing a name or a time have no computable count and are skipped.
    fn refresh_interval(&mut self, program: &Program) {
        if let (Some(name), Some((start, end))) = (&program.program_name, program.times()) {
            self.intervals
                .insert(name.clone(), count_15min_intervals(start, end));
        }
    }

    fn named<'a>(&'a self, program_name: &'a str) -> impl Iterator<Item = &'a Program> + 'a {
        self.programs
            .iter()
            .filter(move |p| p.program_name.as_deref() == Some(program_name))
    }

    fn timed(&self) -> impl Iterator<Item = (&Program, TimeOfDay, TimeOfDay)> + '_ {
        self.programs
            .iter()
            .filter_map(|p| p.times().map(|(start, end)| (p, start, end)))
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the simulated connection state.
    ///
    /// While unhealthy every query fails with a retryable connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Insert a program row without touching `program_intervals`.
    pub fn insert_program_row(
        &self,
        program_name: Option<&str>,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
    ) -> ProgramId {
        self.data
            .write()
            .push_program(program_name, start_time, end_time)
    }

    /// Write an interval row directly, replacing any row with the same name.
    pub fn put_interval_row(&self, program_name: &str, interval_count: i32) {
        self.data
            .write()
            .intervals
            .insert(program_name.to_string(), interval_count);
    }

    /// Remove an interval row directly. Returns whether a row existed.
    pub fn remove_interval_row(&self, program_name: &str) -> bool {
        self.data.write().intervals.remove(program_name).is_some()
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.data.read().is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection(
                "Local repository is marked unhealthy",
                ErrorContext::new(operation),
            ))
        }
    }

    /// Run a read-only closure over the data after the health gate.
    fn read<T>(&self, operation: &str, f: impl FnOnce(&LocalData) -> T) -> RepositoryResult<T> {
        self.ensure_healthy(operation)?;
        Ok(f(&self.data.read()))
    }

    fn write<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut LocalData) -> T,
    ) -> RepositoryResult<T> {
        self.ensure_healthy(operation)?;
        Ok(f(&mut self.data.write()))
    }
}

#[async_trait]
impl ProgramRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn insert_program(
        &self,
        program_name: Option<&str>,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
    ) -> RepositoryResult<ProgramId> {
        self.write("insert_program", |data| {
            let id = data.push_program(program_name, start_time, end_time);
            if let Some(program) = data.programs.last().cloned() {
                data.refresh_interval(&program);
            }
            id
        })
    }

    async fn update_program_times(
        &self,
        program_name: &str,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> RepositoryResult<u64> {
        self.write("update_program_times", |data| {
            let mut updated = Vec::new();
            for program in data
                .programs
                .iter_mut()
                .filter(|p| p.program_name.as_deref() == Some(program_name))
            {
                program.start_time = Some(start_time);
                program.end_time = Some(end_time);
                updated.push(program.clone());
            }
            for program in &updated {
                data.refresh_interval(program);
            }
            updated.len() as u64
        })
    }

    async fn rename_program(&self, old_name: &str, new_name: &str) -> RepositoryResult<u64> {
        self.write("rename_program", |data| {
            let mut renamed = Vec::new();
            for program in data
                .programs
                .iter_mut()
                .filter(|p| p.program_name.as_deref() == Some(old_name))
            {
                program.program_name = Some(new_name.to_string());
                renamed.push(program.clone());
            }
            if !renamed.is_empty() {
                data.intervals.remove(old_name);
            }
            for program in &renamed {
                data.refresh_interval(program);
            }
            renamed.len() as u64
        })
    }

    async fn delete_program(&self, program_name: &str) -> RepositoryResult<u64> {
        self.write("delete_program", |data| {
            let before = data.programs.len();
            data.programs
                .retain(|p| p.program_name.as_deref() != Some(program_name));
            let deleted = before - data.programs.len();
            if deleted > 0 {
                data.intervals.remove(program_name);
            }
            deleted as u64
        })
    }

    async fn list_programs(&self) -> RepositoryResult<Vec<Program>> {
        self.read("list_programs", |data| {
            let mut programs = data.programs.clone();
            programs.sort_by(|a, b| {
                a.program_name
                    .cmp(&b.program_name)
                    .then(a.id.cmp(&b.id))
            });
            programs
        })
    }

    async fn list_program_intervals(&self) -> RepositoryResult<Vec<ProgramInterval>> {
        self.read("list_program_intervals", |data| {
            data.intervals
                .iter()
                .map(|(name, count)| ProgramInterval {
                    program_name: name.clone(),
                    interval_count: *count,
                })
                .collect()
        })
    }

    async fn get_program_interval(
        &self,
        program_name: &str,
    ) -> RepositoryResult<Vec<ProgramInterval>> {
        self.read("get_program_interval", |data| {
            data.intervals
                .get(program_name)
                .map(|count| ProgramInterval {
                    program_name: program_name.to_string(),
                    interval_count: *count,
                })
                .into_iter()
                .collect()
        })
    }

    async fn clear_programs(&self) -> RepositoryResult<()> {
        self.write("clear_programs", |data| {
            data.intervals.clear();
            data.programs.clear();
        })
    }
}

#[async_trait]
impl IntegrityRepository for LocalRepository {
    async fn fetch_orphaned_interval_names(&self) -> RepositoryResult<Vec<String>> {
        self.read("fetch_orphaned_interval_names", |data| {
            data.intervals
                .keys()
                .filter(|name| data.named(name).next().is_none())
                .cloned()
                .collect()
        })
    }

    async fn fetch_programs_missing_intervals(&self) -> RepositoryResult<Vec<Option<String>>> {
        self.read("fetch_programs_missing_intervals", |data| {
            data.programs
                .iter()
                .filter(|p| {
                    p.program_name
                        .as_ref()
                        .map_or(true, |name| !data.intervals.contains_key(name))
                })
                .map(|p| p.program_name.clone())
                .collect()
        })
    }

    async fn fetch_programs_with_invalid_times(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        self.read("fetch_programs_with_invalid_times", |data| {
            data.programs
                .iter()
                .filter(|p| p.start_time.is_none() || p.end_time.is_none())
                .map(Program::to_times)
                .collect()
        })
    }

    async fn fetch_overlapping_programs(&self) -> RepositoryResult<Vec<OverlappingPair>> {
        self.read("fetch_overlapping_programs", |data| {
            let timed: Vec<_> = data.timed().collect();
            let mut pairs = Vec::new();
            for (i, (p1, start1, end1)) in timed.iter().enumerate() {
                for (p2, start2, end2) in &timed[i + 1..] {
                    if rules::overlaps((*start1, *end1), (*start2, *end2)) {
                        pairs.push(OverlappingPair {
                            program1: p1.program_name.clone(),
                            program2: p2.program_name.clone(),
                            start1: *start1,
                            end1: *end1,
                            start2: *start2,
                            end2: *end2,
                        });
                    }
                }
            }
            pairs
        })
    }

    async fn fetch_negative_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        self.read("fetch_negative_duration_programs", |data| {
            data.timed()
                .filter(|(_, start, end)| rules::is_negative_duration(*start, *end))
                .map(|(p, _, _)| p.to_times())
                .collect()
        })
    }

    async fn fetch_interval_mismatches(&self) -> RepositoryResult<Vec<IntervalMismatch>> {
        self.read("fetch_interval_mismatches", |data| {
            data.timed()
                .filter_map(|(p, start, end)| {
                    let name = p.program_name.as_ref()?;
                    let stored_count = *data.intervals.get(name)?;
                    let calculated_count = count_15min_intervals(start, end);
                    (stored_count != calculated_count).then(|| IntervalMismatch {
                        program_name: name.clone(),
                        start_time: start,
                        end_time: end,
                        stored_count,
                        calculated_count,
                    })
                })
                .collect()
        })
    }

    async fn fetch_duplicate_names(&self) -> RepositoryResult<Vec<DuplicateName>> {
        self.read("fetch_duplicate_names", |data| {
            let mut counts: BTreeMap<Option<&str>, i64> = BTreeMap::new();
            for program in &data.programs {
                *counts.entry(program.program_name.as_deref()).or_default() += 1;
            }
            counts
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(name, count)| DuplicateName {
                    program_name: name.map(str::to_string),
                    count,
                })
                .collect()
        })
    }

    async fn fetch_programs_with_empty_names(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        self.read("fetch_programs_with_empty_names", |data| {
            data.programs
                .iter()
                .filter(|p| rules::is_blank_name(p.program_name.as_deref()))
                .map(Program::to_times)
                .collect()
        })
    }

    async fn fetch_long_names(&self) -> RepositoryResult<Vec<LongName>> {
        self.read("fetch_long_names", |data| {
            data.programs
                .iter()
                .filter_map(|p| p.program_name.as_ref())
                .filter(|name| rules::is_long_name(name))
                .map(|name| LongName {
                    program_name: name.clone(),
                    name_length: rules::name_length(name) as i32,
                })
                .collect()
        })
    }

    async fn fetch_zero_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        self.read("fetch_zero_duration_programs", |data| {
            data.timed()
                .filter(|(_, start, end)| rules::is_zero_duration(*start, *end))
                .map(|(p, _, _)| p.to_times())
                .collect()
        })
    }

    async fn fetch_programs_exceeding_day(&self) -> RepositoryResult<Vec<ExcessiveDuration>> {
        self.read("fetch_programs_exceeding_day", |data| {
            data.timed()
                .filter(|(_, start, end)| rules::exceeds_max_duration(*start, *end))
                .map(|(p, start, end)| ExcessiveDuration {
                    program_name: p.program_name.clone(),
                    start_time: start,
                    end_time: end,
                    duration: wrapped_duration(start, end),
                })
                .collect()
        })
    }

    async fn fetch_suspicious_names(&self) -> RepositoryResult<Vec<String>> {
        self.read("fetch_suspicious_names", |data| {
            data.programs
                .iter()
                .filter_map(|p| p.program_name.as_ref())
                .filter(|name| rules::suspicious_pattern(name).is_some())
                .cloned()
                .collect()
        })
    }

    async fn fetch_non_standard_time_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        self.read("fetch_non_standard_time_programs", |data| {
            let off_grid = |t: Option<TimeOfDay>| t.is_some_and(|t| !rules::is_quarter_hour_aligned(t));
            data.programs
                .iter()
                .filter(|p| off_grid(p.start_time) || off_grid(p.end_time))
                .map(Program::to_times)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Option<TimeOfDay> {
        Some(s.parse().unwrap())
    }

    #[tokio::test]
    async fn test_insert_maintains_interval_row() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("Morning News"), t("06:00"), t("07:30"))
            .await
            .unwrap();

        let intervals = repo.list_program_intervals().await.unwrap();
        assert_eq!(
            intervals,
            vec![ProgramInterval {
                program_name: "Morning News".to_string(),
                interval_count: 6,
            }]
        );
    }

    #[tokio::test]
    async fn test_insert_with_null_time_skips_interval_row() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("Broken"), None, t("07:30"))
            .await
            .unwrap();

        assert!(repo.list_program_intervals().await.unwrap().is_empty());
        assert_eq!(
            repo.fetch_programs_missing_intervals().await.unwrap(),
            vec![Some("Broken".to_string())]
        );
    }

    #[tokio::test]
    async fn test_update_recomputes_interval() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("Talk Show"), t("20:00"), t("21:00"))
            .await
            .unwrap();
        let updated = repo
            .update_program_times("Talk Show", "22:00".parse().unwrap(), "01:00".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let rows = repo.get_program_interval("Talk Show").await.unwrap();
        assert_eq!(rows[0].interval_count, 12);
    }

    #[tokio::test]
    async fn test_rename_moves_interval_row() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("Old Name"), t("09:00"), t("10:00"))
            .await
            .unwrap();
        repo.rename_program("Old Name", "New Name").await.unwrap();

        assert!(repo.get_program_interval("Old Name").await.unwrap().is_empty());
        assert_eq!(
            repo.get_program_interval("New Name").await.unwrap()[0].interval_count,
            4
        );
    }

    #[tokio::test]
    async fn test_delete_removes_interval_row() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("Gone"), t("09:00"), t("10:00"))
            .await
            .unwrap();

        assert_eq!(repo.delete_program("Gone").await.unwrap(), 1);
        assert!(repo.list_programs().await.unwrap().is_empty());
        assert!(repo.list_program_intervals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_raw_rows_bypass_trigger() {
        let repo = LocalRepository::new();
        repo.insert_program_row(Some("No Interval"), t("09:00"), t("10:00"));
        repo.put_interval_row("Ghost", 3);

        assert_eq!(
            repo.fetch_orphaned_interval_names().await.unwrap(),
            vec!["Ghost".to_string()]
        );
        assert_eq!(
            repo.fetch_programs_missing_intervals().await.unwrap(),
            vec![Some("No Interval".to_string())]
        );
        assert!(repo.remove_interval_row("Ghost"));
        assert!(!repo.remove_interval_row("Ghost"));
    }

    #[tokio::test]
    async fn test_list_programs_sorted_by_name() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("B"), t("09:00"), t("10:00")).await.unwrap();
        repo.insert_program(Some("A"), t("10:00"), t("11:00")).await.unwrap();
        repo.insert_program(None, t("11:00"), t("12:00")).await.unwrap();

        let names: Vec<_> = repo
            .list_programs()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.program_name)
            .collect();
        assert_eq!(names, vec![None, Some("A".to_string()), Some("B".to_string())]);
    }

    #[tokio::test]
    async fn test_duplicate_null_names_group_together() {
        let repo = LocalRepository::new();
        repo.insert_program_row(None, t("09:00"), t("10:00"));
        repo.insert_program_row(None, t("10:00"), t("11:00"));

        let dups = repo.fetch_duplicate_names().await.unwrap();
        assert_eq!(
            dups,
            vec![DuplicateName {
                program_name: None,
                count: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_non_standard_times_ignore_nulls() {
        let repo = LocalRepository::new();
        repo.insert_program_row(Some("Null start"), None, t("10:00"));
        repo.insert_program_row(Some("Null start odd end"), None, t("10:07"));

        let rows = repo.fetch_non_standard_time_programs().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].program_name.as_deref(), Some("Null start odd end"));
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails_queries() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);

        assert!(!repo.health_check().await.unwrap());
        let err = repo.fetch_duplicate_names().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err.context().and_then(|c| c.operation.as_deref()),
            Some("fetch_duplicate_names")
        );
    }

    #[tokio::test]
    async fn test_clear_programs() {
        let repo = LocalRepository::new();
        repo.insert_program(Some("X"), t("09:00"), t("10:00")).await.unwrap();
        repo.put_interval_row("Y", 1);
        repo.clear_programs().await.unwrap();

        assert!(repo.list_programs().await.unwrap().is_empty());
        assert!(repo.list_program_intervals().await.unwrap().is_empty());
    }
}
