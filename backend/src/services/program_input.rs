//! Validation of raw program rows before they are written.
//!
//! Loaders call [`validate_program_input`] on each incoming record and keep
//! the messages for their rejection report. An empty result means the row can
//! be inserted.

use super::rules::MAX_NAME_LENGTH;
use crate::models::TimeOfDay;

/// Substrings rejected outright in incoming names.
///
/// Stricter than the post-load business rules: `script` is only a warning
/// there and is accepted here.
pub const REJECTED_NAME_PATTERNS: [&str; 7] =
    ["drop", "delete", "insert", "update", "select", "--", ";"];

/// Validate one incoming row. Inputs are trimmed before checking.
pub fn validate_program_input(program_name: &str, start_time: &str, end_time: &str) -> Vec<String> {
    let program_name = program_name.trim();
    let start_time = start_time.trim();
    let end_time = end_time.trim();
    let mut errors = Vec::new();

    if program_name.is_empty() {
        errors.push("Program name is missing or empty".to_string());
    }
    if start_time.is_empty() {
        errors.push("Start time is missing or empty".to_string());
    }
    if end_time.is_empty() {
        errors.push("End time is missing or empty".to_string());
    }

    let lowered = program_name.to_lowercase();
    if lowered.contains("null") {
        errors.push("Program name contains NULL value".to_string());
    }

    if program_name.chars().count() > MAX_NAME_LENGTH {
        errors.push(format!(
            "Program name exceeds maximum length ({} characters)",
            MAX_NAME_LENGTH
        ));
    }

    if !start_time.is_empty() {
        errors.extend(validate_time_field(start_time, "start_time"));
    }
    if !end_time.is_empty() {
        errors.extend(validate_time_field(end_time, "end_time"));
    }

    for pattern in REJECTED_NAME_PATTERNS {
        if lowered.contains(pattern) {
            errors.push(format!(
                "Program name contains potentially dangerous pattern: {}",
                pattern
            ));
        }
    }

    errors
}

fn validate_time_field(value: &str, field_name: &str) -> Option<String> {
    if value.eq_ignore_ascii_case("null") {
        return Some(format!("{} contains NULL or empty value", field_name));
    }
    value
        .parse::<TimeOfDay>()
        .err()
        .map(|e| format!("{} {}", field_name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_row() {
        assert!(validate_program_input("Morning News", "06:00", "07:30").is_empty());
        assert!(validate_program_input("Late Movie", "23:00", "01:15:30").is_empty());
        assert!(validate_program_input("Close", "23:45", "24:00").is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let errors = validate_program_input("  ", "", "");
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&"Program name is missing or empty".to_string()));
    }

    #[test]
    fn test_null_literals() {
        let errors = validate_program_input("NULL", "null", "10:00");
        assert!(errors.contains(&"Program name contains NULL value".to_string()));
        assert!(errors.contains(&"start_time contains NULL or empty value".to_string()));
    }

    #[test]
    fn test_time_errors_name_the_field() {
        let errors = validate_program_input("Show", "25:00", "10:75");
        assert_eq!(
            errors,
            vec![
                "start_time hour out of range (0-24): 25".to_string(),
                "end_time minute out of range (0-59): 75".to_string(),
            ]
        );
    }

    #[test]
    fn test_only_midnight_allowed_at_24() {
        let errors = validate_program_input("Show", "23:00", "24:30");
        assert_eq!(
            errors,
            vec!["end_time invalid time 24:30:00, only 24:00 is valid".to_string()]
        );
    }

    #[test]
    fn test_missing_colon() {
        let errors = validate_program_input("Show", "0900", "10:00");
        assert_eq!(errors, vec!["start_time missing colon separator: 0900".to_string()]);
    }

    #[test]
    fn test_dangerous_patterns() {
        let errors = validate_program_input("'; DROP TABLE programs; --", "09:00", "10:00");
        assert!(errors
            .iter()
            .any(|e| e.ends_with("dangerous pattern: drop")));
        assert!(errors.iter().any(|e| e.ends_with("dangerous pattern: ;")));
        assert!(errors.iter().any(|e| e.ends_with("dangerous pattern: --")));
    }

    #[test]
    fn test_overlong_name() {
        let errors = validate_program_input(&"x".repeat(256), "09:00", "10:00");
        assert_eq!(
            errors,
            vec!["Program name exceeds maximum length (255 characters)".to_string()]
        );
    }
}
