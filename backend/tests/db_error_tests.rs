//! Tests for db::repository::error - error construction, context and display.

use tv_intervals::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

#[test]
fn test_error_context_new() {
    let ctx = ErrorContext::new("fetch_overlapping_programs");
    assert_eq!(ctx.operation.as_deref(), Some("fetch_overlapping_programs"));
    assert!(ctx.table.is_none());
    assert!(ctx.details.is_none());
    assert!(!ctx.retryable);
}

#[test]
fn test_error_context_display_lists_set_fields_in_order() {
    let ctx = ErrorContext::new("insert_program")
        .with_table("programs")
        .with_details("name=Evening News")
        .retryable();

    assert_eq!(
        ctx.to_string(),
        " [operation=insert_program, table=programs, details=name=Evening News, retryable]"
    );
}

#[test]
fn test_error_context_display_empty() {
    assert_eq!(ErrorContext::default().to_string(), "");
}

#[test]
fn test_connection_errors_are_always_retryable() {
    let err = RepositoryError::connection(
        "server closed the connection unexpectedly",
        ErrorContext::new("fetch_interval_mismatches"),
    );
    assert!(err.is_retryable());
    assert!(err.to_string().starts_with("Connection error:"));
    assert!(err.to_string().contains("operation=fetch_interval_mismatches"));
}

#[test]
fn test_query_error_is_retryable_only_when_flagged() {
    let plain = RepositoryError::query("syntax error", ErrorContext::new("fetch_long_names"));
    assert!(!plain.is_retryable());

    let conflict = RepositoryError::query(
        "could not serialize access",
        ErrorContext::new("clear_programs").retryable(),
    );
    assert!(conflict.is_retryable());
}

#[test]
fn test_decode_error_keeps_column_and_raw_value() {
    let err = RepositoryError::decode(
        "start_time",
        "noon",
        "invalid time format",
        ErrorContext::new("list_programs").with_table("programs"),
    );

    assert!(!err.is_retryable());
    assert_eq!(
        err.context().and_then(|c| c.table.as_deref()),
        Some("programs")
    );
    let message = err.to_string();
    assert!(message.contains("start_time"));
    assert!(message.contains("'noon'"));
}

#[test]
fn test_configuration_error_has_no_context() {
    let err = RepositoryError::configuration("missing database_url");
    assert!(err.context().is_none());
    assert!(!err.is_retryable());
    assert_eq!(err.to_string(), "Configuration error: missing database_url");
}

#[test]
fn test_configuration_error_ignores_operation() {
    let err = RepositoryError::configuration("bad type").with_operation("create");
    assert!(err.context().is_none());
}

#[test]
fn test_transaction_error_display() {
    let err = RepositoryError::transaction(
        "deadlock detected",
        ErrorContext::new("clear_programs").with_table("program_intervals"),
    );
    assert!(err.to_string().contains("Transaction error"));
    assert!(err.to_string().contains("table=program_intervals"));
}

#[test]
fn test_with_operation_overrides_context_operation() {
    let err = RepositoryError::query("error", ErrorContext::new("load_rows"))
        .with_operation("fetch_duplicate_names");
    assert_eq!(
        err.context().and_then(|c| c.operation.as_deref()),
        Some("fetch_duplicate_names")
    );
}

#[test]
fn test_internal_error_display() {
    let err = RepositoryError::internal("task panicked", ErrorContext::new("spawn_blocking"));
    assert_eq!(
        err.to_string(),
        "Internal error: task panicked [operation=spawn_blocking]"
    );
}

#[test]
fn test_repository_result_propagates_with_question_mark() {
    fn inner() -> RepositoryResult<i32> {
        Err(RepositoryError::configuration("unset"))
    }
    fn outer() -> RepositoryResult<i32> {
        Ok(inner()? + 1)
    }
    assert!(matches!(
        outer(),
        Err(RepositoryError::ConfigurationError { .. })
    ));
}
