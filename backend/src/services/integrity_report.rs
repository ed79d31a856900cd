//! Plain-text rendering of a comprehensive integrity run.

use super::integrity::ComprehensiveValidation;

const RULE_WIDTH: usize = 60;

fn status(valid: bool) -> &'static str {
    if valid {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Render `run` as a multi-section text report.
///
/// The output is a pure function of the run's verdicts and messages (the run
/// timestamp is not printed), so identical runs render identically.
pub fn format_validation_report(run: &ComprehensiveValidation) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "DATA INTEGRITY VALIDATION REPORT".to_string(),
        rule.clone(),
        format!("Overall Status: {}", status(run.overall_valid)),
        format!("Checks Performed: {}", run.summary.checks_performed),
        format!("Total Errors: {}", run.summary.total_errors),
        format!("Total Warnings: {}", run.summary.total_warnings),
        String::new(),
    ];

    for (kind, check) in run.checks() {
        lines.push(format!("{}:", kind.title()));
        lines.push(format!("  Status: {}", status(check.is_valid())));

        if !check.errors().is_empty() {
            lines.push("  Errors:".to_string());
            lines.extend(check.errors().iter().map(|e| format!("    - {}", e)));
        }

        if !check.warnings().is_empty() {
            lines.push("  Warnings:".to_string());
            lines.extend(check.warnings().iter().map(|w| format!("    - {}", w)));
        }

        lines.push(String::new());
    }

    lines.push(rule);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::integrity::{
        BusinessRulesResult, DataQualityResult, IntervalCalculationResult,
        ReferentialIntegrityResult, TimeConstraintResult,
    };

    fn run_with(orphans: Vec<String>, suspicious: Vec<String>) -> ComprehensiveValidation {
        let errors: Vec<String> = if orphans.is_empty() {
            Vec::new()
        } else {
            vec![format!("Found {} orphaned interval records", orphans.len())]
        };
        let warnings: Vec<String> = if suspicious.is_empty() {
            Vec::new()
        } else {
            vec![format!(
                "Found {} programs with suspicious names",
                suspicious.len()
            )]
        };
        ComprehensiveValidation::from_results(
            ReferentialIntegrityResult {
                is_valid: errors.is_empty(),
                errors,
                warnings: Vec::new(),
                orphaned_intervals: orphans,
                missing_intervals: Vec::new(),
            },
            TimeConstraintResult {
                is_valid: true,
                errors: Vec::new(),
                warnings: Vec::new(),
                invalid_times: Vec::new(),
                overlapping_programs: Vec::new(),
                negative_durations: Vec::new(),
            },
            IntervalCalculationResult {
                is_valid: true,
                errors: Vec::new(),
                warnings: Vec::new(),
                incorrect_calculations: Vec::new(),
            },
            DataQualityResult {
                is_valid: true,
                errors: Vec::new(),
                warnings: Vec::new(),
                duplicate_names: Vec::new(),
                empty_names: Vec::new(),
                long_names: Vec::new(),
                zero_duration: Vec::new(),
            },
            BusinessRulesResult {
                is_valid: true,
                errors: Vec::new(),
                warnings,
                excessive_durations: Vec::new(),
                suspicious_patterns: suspicious,
                non_standard_times: Vec::new(),
            },
        )
    }

    #[test]
    fn test_clean_run_has_no_message_blocks() {
        let report = format_validation_report(&run_with(Vec::new(), Vec::new()));

        assert!(report.starts_with(&"=".repeat(RULE_WIDTH)));
        assert!(report.ends_with(&"=".repeat(RULE_WIDTH)));
        assert!(report.contains("Overall Status: PASS"));
        assert_eq!(report.matches("  Status: PASS").count(), 5);
        assert!(!report.contains("  Errors:"));
        assert!(!report.contains("  Warnings:"));
    }

    #[test]
    fn test_sections_follow_check_order() {
        let report = format_validation_report(&run_with(Vec::new(), Vec::new()));
        let positions: Vec<usize> = [
            "REFERENTIAL INTEGRITY:",
            "TIME CONSTRAINTS:",
            "INTERVAL CALCULATIONS:",
            "DATA QUALITY:",
            "BUSINESS RULES:",
        ]
        .iter()
        .map(|title| report.find(title).unwrap())
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_errors_and_warnings_are_listed_under_their_check() {
        let run = run_with(vec!["Ghost".into()], vec!["DROP it".into()]);
        let report = format_validation_report(&run);

        assert!(report.contains("Overall Status: FAIL"));
        assert!(report.contains("Total Errors: 1"));
        assert!(report.contains("Total Warnings: 1"));
        assert!(report.contains(
            "REFERENTIAL INTEGRITY:\n  Status: FAIL\n  Errors:\n    - Found 1 orphaned interval records"
        ));
        assert!(report.contains(
            "BUSINESS RULES:\n  Status: PASS\n  Warnings:\n    - Found 1 programs with suspicious names"
        ));
    }

    #[test]
    fn test_report_ignores_timestamp() {
        let mut first = run_with(vec!["Ghost".into()], Vec::new());
        let second = first.clone();
        first.checked_at = first.checked_at - chrono::Duration::hours(1);

        assert_eq!(
            format_validation_report(&first),
            format_validation_report(&second)
        );
    }
}
