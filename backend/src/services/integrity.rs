//! Data-integrity validation for the program schedule dataset.
//!
//! [`IntegrityValidator`] runs a fixed battery of independent, read-only checks
//! through an injected [`IntegrityRepository`] and reports findings per check:
//!
//! 1. Referential integrity between `programs` and `program_intervals`
//! 2. Time constraints (missing times, overlaps, negative durations)
//! 3. Stored interval counts against the recomputed count
//! 4. Data quality (duplicate, empty and overlong names, zero durations)
//! 5. Business rules (over-long programs, suspicious names, off-grid times)
//!
//! Findings come in two kinds. An *error* is a structural defect that should
//! block acceptance of the dataset and marks its check invalid. A *warning* is
//! a suspicious but possibly intentional pattern left for human review; it
//! never affects validity.
//!
//! Query failures are not findings: they propagate as [`RepositoryError`].
//!
//! [`RepositoryError`]: crate::db::repository::RepositoryError

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::db::repository::{IntegrityRepository, RepositoryResult};
use crate::models::{
    DuplicateName, ExcessiveDuration, IntervalMismatch, LongName, OverlappingPair, ProgramTimes,
};

/// The checks performed by a comprehensive run, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityCheck {
    ReferentialIntegrity,
    TimeConstraints,
    IntervalCalculations,
    DataQuality,
    BusinessRules,
}

impl IntegrityCheck {
    pub const ALL: [IntegrityCheck; 5] = [
        IntegrityCheck::ReferentialIntegrity,
        IntegrityCheck::TimeConstraints,
        IntegrityCheck::IntervalCalculations,
        IntegrityCheck::DataQuality,
        IntegrityCheck::BusinessRules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityCheck::ReferentialIntegrity => "referential_integrity",
            IntegrityCheck::TimeConstraints => "time_constraints",
            IntegrityCheck::IntervalCalculations => "interval_calculations",
            IntegrityCheck::DataQuality => "data_quality",
            IntegrityCheck::BusinessRules => "business_rules",
        }
    }

    /// Section heading used in the text report.
    pub fn title(&self) -> String {
        self.as_str().to_uppercase().replace('_', " ")
    }
}

/// Common view over the per-check result records.
pub trait CheckOutcome {
    fn is_valid(&self) -> bool;
    fn errors(&self) -> &[String];
    fn warnings(&self) -> &[String];

    /// One line per offending record, for assertion and log messages.
    fn offenders(&self) -> Vec<String>;
}

macro_rules! impl_check_outcome {
    ($ty:ty, |$r:ident| $offenders:expr) => {
        impl CheckOutcome for $ty {
            fn is_valid(&self) -> bool {
                self.is_valid
            }

            fn errors(&self) -> &[String] {
                &self.errors
            }

            fn warnings(&self) -> &[String] {
                &self.warnings
            }

            fn offenders(&self) -> Vec<String> {
                let $r = self;
                $offenders
            }
        }
    };
}

fn describe_times(label: &str, p: &ProgramTimes) -> String {
    let fmt = |t: Option<crate::models::TimeOfDay>| {
        t.map_or_else(|| "<null>".to_string(), |t| t.to_string())
    };
    format!(
        "{}: {} ({} - {})",
        label,
        p.display_name(),
        fmt(p.start_time),
        fmt(p.end_time)
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferentialIntegrityResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub orphaned_intervals: Vec<String>,
    pub missing_intervals: Vec<Option<String>>,
}

impl_check_outcome!(ReferentialIntegrityResult, |r| {
    r.orphaned_intervals
        .iter()
        .map(|n| format!("orphaned interval: {}", n))
        .chain(
            r.missing_intervals
                .iter()
                .map(|n| {
                    format!("missing interval: {}", n.as_deref().unwrap_or("<null>"))
                }),
        )
        .collect()
});

#[derive(Debug, Clone, Serialize)]
pub struct TimeConstraintResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub invalid_times: Vec<ProgramTimes>,
    pub overlapping_programs: Vec<OverlappingPair>,
    pub negative_durations: Vec<ProgramTimes>,
}

impl_check_outcome!(TimeConstraintResult, |r| {
    let mut lines: Vec<String> = r
        .invalid_times
        .iter()
        .map(|p| describe_times("invalid time", p))
        .collect();
    lines.extend(r.overlapping_programs.iter().map(|o| {
        format!(
            "overlap: {} ({} - {}) with {} ({} - {})",
            o.program1.as_deref().unwrap_or("<null>"),
            o.start1,
            o.end1,
            o.program2.as_deref().unwrap_or("<null>"),
            o.start2,
            o.end2
        )
    }));
    lines.extend(
        r.negative_durations
            .iter()
            .map(|p| describe_times("negative duration", p)),
    );
    lines
});

#[derive(Debug, Clone, Serialize)]
pub struct IntervalCalculationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub incorrect_calculations: Vec<IntervalMismatch>,
}

impl_check_outcome!(IntervalCalculationResult, |r| {
    r.incorrect_calculations
        .iter()
        .map(|m| {
            format!(
                "incorrect calculation: {} ({} - {}) stored {} calculated {}",
                m.program_name, m.start_time, m.end_time, m.stored_count, m.calculated_count
            )
        })
        .collect()
});

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duplicate_names: Vec<DuplicateName>,
    pub empty_names: Vec<ProgramTimes>,
    pub long_names: Vec<LongName>,
    pub zero_duration: Vec<ProgramTimes>,
}

impl_check_outcome!(DataQualityResult, |r| {
    let mut lines: Vec<String> = r
        .duplicate_names
        .iter()
        .map(|d| {
            format!(
                "duplicate name: {} x{}",
                d.program_name.as_deref().unwrap_or("<null>"),
                d.count
            )
        })
        .collect();
    lines.extend(r.empty_names.iter().map(|p| describe_times("empty name", p)));
    lines.extend(r.long_names.iter().map(|l| {
        let prefix: String = l.program_name.chars().take(32).collect();
        format!("long name: {}... ({} characters)", prefix, l.name_length)
    }));
    lines.extend(
        r.zero_duration
            .iter()
            .map(|p| describe_times("zero duration", p)),
    );
    lines
});

#[derive(Debug, Clone, Serialize)]
pub struct BusinessRulesResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub excessive_durations: Vec<ExcessiveDuration>,
    pub suspicious_patterns: Vec<String>,
    pub non_standard_times: Vec<ProgramTimes>,
}

impl_check_outcome!(BusinessRulesResult, |r| {
    let mut lines: Vec<String> = r
        .excessive_durations
        .iter()
        .map(|e| {
            format!(
                "longer than 24 hours: {} ({} - {}, {} minutes)",
                e.program_name.as_deref().unwrap_or("<null>"),
                e.start_time,
                e.end_time,
                e.duration.value()
            )
        })
        .collect();
    lines.extend(
        r.suspicious_patterns
            .iter()
            .map(|n| format!("suspicious name: {}", n)),
    );
    lines.extend(
        r.non_standard_times
            .iter()
            .map(|p| describe_times("non-standard time slot", p)),
    );
    lines
});

/// Aggregate counts over a comprehensive run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub checks_performed: usize,
    /// Error lines of invalid checks only.
    pub total_errors: usize,
    /// Warning lines of every check, valid or not.
    pub total_warnings: usize,
}

impl ValidationSummary {
    pub fn from_checks<'a>(checks: impl IntoIterator<Item = &'a dyn CheckOutcome>) -> Self {
        checks
            .into_iter()
            .fold(ValidationSummary::default(), |mut summary, check| {
                summary.checks_performed += 1;
                if !check.is_valid() {
                    summary.total_errors += check.errors().len();
                }
                summary.total_warnings += check.warnings().len();
                summary
            })
    }
}

/// Results of every check plus the aggregate verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveValidation {
    pub overall_valid: bool,
    pub summary: ValidationSummary,
    pub checked_at: DateTime<Utc>,
    pub referential_integrity: ReferentialIntegrityResult,
    pub time_constraints: TimeConstraintResult,
    pub interval_calculations: IntervalCalculationResult,
    pub data_quality: DataQualityResult,
    pub business_rules: BusinessRulesResult,
}

impl ComprehensiveValidation {
    /// Assemble a run from its per-check results, computing the summary.
    pub fn from_results(
        referential_integrity: ReferentialIntegrityResult,
        time_constraints: TimeConstraintResult,
        interval_calculations: IntervalCalculationResult,
        data_quality: DataQualityResult,
        business_rules: BusinessRulesResult,
    ) -> Self {
        let mut run = Self {
            overall_valid: true,
            summary: ValidationSummary::default(),
            checked_at: Utc::now(),
            referential_integrity,
            time_constraints,
            interval_calculations,
            data_quality,
            business_rules,
        };
        run.summary = ValidationSummary::from_checks(run.checks().map(|(_, c)| c));
        let overall_valid = run.checks().all(|(_, c)| c.is_valid());
        run.overall_valid = overall_valid;
        run
    }

    pub fn check(&self, kind: IntegrityCheck) -> &dyn CheckOutcome {
        match kind {
            IntegrityCheck::ReferentialIntegrity => &self.referential_integrity,
            IntegrityCheck::TimeConstraints => &self.time_constraints,
            IntegrityCheck::IntervalCalculations => &self.interval_calculations,
            IntegrityCheck::DataQuality => &self.data_quality,
            IntegrityCheck::BusinessRules => &self.business_rules,
        }
    }

    /// Every check in report order.
    pub fn checks(&self) -> impl Iterator<Item = (IntegrityCheck, &dyn CheckOutcome)> + '_ {
        IntegrityCheck::ALL
            .into_iter()
            .map(move |kind| (kind, self.check(kind)))
    }
}

/// Runs the integrity checks against a repository.
///
/// # Example
/// ```ignore
/// let validator = IntegrityValidator::new(repo);
/// let run = validator.run_comprehensive_validation().await?;
/// println!("{}", format_validation_report(&run));
/// ```
pub struct IntegrityValidator<R: ?Sized> {
    repo: Arc<R>,
}

impl<R: ?Sized> Clone for IntegrityValidator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: IntegrityRepository + ?Sized> IntegrityValidator<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Both directions of the name-keyed 1:1 correspondence.
    pub async fn validate_referential_integrity(
        &self,
    ) -> RepositoryResult<ReferentialIntegrityResult> {
        let mut errors = Vec::new();

        let orphaned_intervals = self.repo.fetch_orphaned_interval_names().await?;
        if !orphaned_intervals.is_empty() {
            errors.push(format!(
                "Found {} orphaned interval records",
                orphaned_intervals.len()
            ));
        }

        let missing_intervals = self.repo.fetch_programs_missing_intervals().await?;
        if !missing_intervals.is_empty() {
            errors.push(format!(
                "Found {} programs without interval records",
                missing_intervals.len()
            ));
        }

        let result = ReferentialIntegrityResult {
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
            orphaned_intervals,
            missing_intervals,
        };
        log_outcome(IntegrityCheck::ReferentialIntegrity, &result);
        Ok(result)
    }

    /// Missing times, linear overlaps and unexplained negative durations.
    pub async fn validate_time_constraints(&self) -> RepositoryResult<TimeConstraintResult> {
        let mut errors = Vec::new();

        let invalid_times = self.repo.fetch_programs_with_invalid_times().await?;
        if !invalid_times.is_empty() {
            errors.push(format!(
                "Found {} programs with invalid time values",
                invalid_times.len()
            ));
        }

        let overlapping_programs = self.repo.fetch_overlapping_programs().await?;
        if !overlapping_programs.is_empty() {
            errors.push(format!(
                "Found {} overlapping program pairs",
                overlapping_programs.len()
            ));
        }

        let negative_durations = self.repo.fetch_negative_duration_programs().await?;
        if !negative_durations.is_empty() {
            errors.push(format!(
                "Found {} programs with negative durations",
                negative_durations.len()
            ));
        }

        let result = TimeConstraintResult {
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
            invalid_times,
            overlapping_programs,
            negative_durations,
        };
        log_outcome(IntegrityCheck::TimeConstraints, &result);
        Ok(result)
    }

    /// Stored interval counts against `count_15min_intervals`.
    pub async fn validate_interval_calculations(
        &self,
    ) -> RepositoryResult<IntervalCalculationResult> {
        let mut errors = Vec::new();

        let incorrect_calculations = self.repo.fetch_interval_mismatches().await?;
        if !incorrect_calculations.is_empty() {
            errors.push(format!(
                "Found {} programs with incorrect interval calculations",
                incorrect_calculations.len()
            ));
        }

        let result = IntervalCalculationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
            incorrect_calculations,
        };
        log_outcome(IntegrityCheck::IntervalCalculations, &result);
        Ok(result)
    }

    /// Name hygiene plus zero-duration programs.
    ///
    /// Zero-duration programs are reported as a warning: they can be
    /// legitimate placeholders and do not invalidate the check.
    pub async fn validate_data_quality(&self) -> RepositoryResult<DataQualityResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let duplicate_names = self.repo.fetch_duplicate_names().await?;
        if !duplicate_names.is_empty() {
            errors.push(format!(
                "Found {} duplicate program names",
                duplicate_names.len()
            ));
        }

        let empty_names = self.repo.fetch_programs_with_empty_names().await?;
        if !empty_names.is_empty() {
            errors.push(format!(
                "Found {} programs with empty names",
                empty_names.len()
            ));
        }

        let long_names = self.repo.fetch_long_names().await?;
        if !long_names.is_empty() {
            errors.push(format!(
                "Found {} programs with names exceeding 255 characters",
                long_names.len()
            ));
        }

        let zero_duration = self.repo.fetch_zero_duration_programs().await?;
        if !zero_duration.is_empty() {
            warnings.push(format!(
                "Found {} zero-duration programs (may be valid)",
                zero_duration.len()
            ));
        }

        let result = DataQualityResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            duplicate_names,
            empty_names,
            long_names,
            zero_duration,
        };
        log_outcome(IntegrityCheck::DataQuality, &result);
        Ok(result)
    }

    /// Broadcast-specific rules.
    ///
    /// Only programs longer than a day are errors; suspicious names and
    /// off-grid times are warnings.
    pub async fn validate_business_rules(&self) -> RepositoryResult<BusinessRulesResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let excessive_durations = self.repo.fetch_programs_exceeding_day().await?;
        if !excessive_durations.is_empty() {
            errors.push(format!(
                "Found {} programs longer than 24 hours",
                excessive_durations.len()
            ));
        }

        let suspicious_patterns = self.repo.fetch_suspicious_names().await?;
        if !suspicious_patterns.is_empty() {
            warnings.push(format!(
                "Found {} programs with suspicious names",
                suspicious_patterns.len()
            ));
        }

        let non_standard_times = self.repo.fetch_non_standard_time_programs().await?;
        if !non_standard_times.is_empty() {
            warnings.push(format!(
                "Found {} programs with non-standard time slots",
                non_standard_times.len()
            ));
        }

        let result = BusinessRulesResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            excessive_durations,
            suspicious_patterns,
            non_standard_times,
        };
        log_outcome(IntegrityCheck::BusinessRules, &result);
        Ok(result)
    }

    /// Run every check in order and aggregate the summary.
    ///
    /// Checks run sequentially against whatever snapshot each query observes;
    /// callers needing cross-check consistency must hold writers off for the
    /// duration of the run.
    pub async fn run_comprehensive_validation(&self) -> RepositoryResult<ComprehensiveValidation> {
        let referential_integrity = self.validate_referential_integrity().await?;
        let time_constraints = self.validate_time_constraints().await?;
        let interval_calculations = self.validate_interval_calculations().await?;
        let data_quality = self.validate_data_quality().await?;
        let business_rules = self.validate_business_rules().await?;

        let run = ComprehensiveValidation::from_results(
            referential_integrity,
            time_constraints,
            interval_calculations,
            data_quality,
            business_rules,
        );

        info!(
            "Integrity validation {}: {} checks, {} errors, {} warnings",
            if run.overall_valid { "passed" } else { "failed" },
            run.summary.checks_performed,
            run.summary.total_errors,
            run.summary.total_warnings
        );
        Ok(run)
    }
}

fn log_outcome(kind: IntegrityCheck, outcome: &dyn CheckOutcome) {
    if outcome.is_valid() {
        debug!(
            "{} passed with {} warning(s)",
            kind.as_str(),
            outcome.warnings().len()
        );
    } else {
        warn!("{} failed: {}", kind.as_str(), outcome.errors().join("; "));
    }
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod integrity_tests;
