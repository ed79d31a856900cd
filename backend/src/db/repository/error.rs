//! Error types for repository operations.
//!
//! Only infrastructure failures travel through [`RepositoryError`]. Defects in
//! the program data itself are findings and never surface here, with one
//! exception: a stored value this crate cannot read at all (a time column that
//! does not parse) is a [`RepositoryError::DecodeError`].

use std::fmt;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where in the program store a call failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Repository operation, e.g. `fetch_interval_mismatches`
    pub operation: Option<String>,
    /// Table the failing statement touched
    pub table: Option<String>,
    pub details: Option<String>,
    /// Set for failures worth another attempt (lost connections, serialization conflicts)
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.operation.as_ref().map(|op| format!("operation={}", op)),
            self.table.as_ref().map(|table| format!("table={}", table)),
            self.details.as_ref().map(|details| format!("details={}", details)),
            self.retryable.then(|| "retryable".to_string()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            Ok(())
        } else {
            write!(f, " [{}]", parts.join(", "))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The program store could not be reached. Always retryable.
    #[error("Connection error: {message}{context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// A statement was rejected or failed while running.
    #[error("Query error: {message}{context}")]
    QueryError {
        message: String,
        context: ErrorContext,
    },

    /// A stored value could not be turned into its model type.
    #[error("Unreadable {column} value '{value}': {message}{context}")]
    DecodeError {
        column: String,
        value: String,
        message: String,
        context: ErrorContext,
    },

    /// A multi-statement write was rolled back.
    #[error("Transaction error: {message}{context}")]
    TransactionError {
        message: String,
        context: ErrorContext,
    },

    /// Bad or missing repository settings.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal error: {message}{context}")]
    InternalError {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn connection(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    pub fn query(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::QueryError {
            message: message.into(),
            context,
        }
    }

    pub fn decode(
        column: impl Into<String>,
        value: impl Into<String>,
        message: impl fmt::Display,
        context: ErrorContext,
    ) -> Self {
        Self::DecodeError {
            column: column.into(),
            value: value.into(),
            message: message.to_string(),
            context,
        }
    }

    pub fn transaction(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::TransactionError {
            message: message.into(),
            context,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::InternalError {
            message: message.into(),
            context,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.context().is_some_and(|context| context.retryable)
    }

    /// Context of the failure; configuration errors carry none.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::DecodeError { context, .. }
            | Self::TransactionError { context, .. }
            | Self::InternalError { context, .. } => Some(context),
            Self::ConfigurationError { .. } => None,
        }
    }

    /// Record the repository operation that was running.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::DecodeError { context, .. }
            | Self::TransactionError { context, .. }
            | Self::InternalError { context, .. } => {
                context.operation = Some(operation.into());
            }
            Self::ConfigurationError { .. } => {}
        }
        self
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(kind, info) => {
                let mut context =
                    ErrorContext::default().with_details(format!("db_error_kind={:?}", kind));
                if let Some(table) = info.table_name() {
                    context = context.with_table(table);
                }
                if matches!(kind, DatabaseErrorKind::SerializationFailure) {
                    context = context.retryable();
                }
                Self::query(info.message(), context)
            }
            Error::DeserializationError(e) => Self::query(
                format!("Row did not match its declared SQL types: {}", e),
                ErrorContext::default(),
            ),
            other => Self::query(other.to_string(), ErrorContext::default()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::connection(
            err.to_string(),
            ErrorContext::default().with_details("pool_error"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_renders_nothing() {
        let err = RepositoryError::query("syntax error", ErrorContext::default());
        assert_eq!(err.to_string(), "Query error: syntax error");
    }

    #[test]
    fn test_decode_error_names_column_and_value() {
        let err = RepositoryError::decode(
            "end_time",
            "25:99",
            "hour out of range",
            ErrorContext::new("list_programs").with_table("programs"),
        );
        assert_eq!(
            err.to_string(),
            "Unreadable end_time value '25:99': hour out of range \
             [operation=list_programs, table=programs]"
        );
        assert!(!err.is_retryable());
    }
}
