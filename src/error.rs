use std::fmt;

use thiserror::Error;

/// Boxed error raised by plugin code that has not been classified yet.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Category of a classified plugin error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginErrorKind {
    /// Bad input, malformed configuration, or a config/context type mismatch.
    InvalidQuerySettings,
    /// Failure while talking to the datasource.
    QueryExecutionError,
}

impl fmt::Display for PluginErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuerySettings => f.write_str("INVALID_QUERY_SETTINGS"),
            Self::QueryExecutionError => f.write_str("QUERY_EXECUTION_ERROR"),
        }
    }
}

/// Stable sub-codes attached to classified plugin errors.
pub mod codes {
    pub const INVALID_QUERY_SETTINGS: &str = "INVALID_QUERY_SETTINGS";
    pub const QUERY_ARGUMENT_ERROR: &str = "QUERY_ARGUMENT_ERROR";
    pub const QUERY_EXECUTION_ERROR: &str = "QUERY_EXECUTION_ERROR";
    pub const DATASOURCE_GET_STRUCTURE_ERROR: &str = "DATASOURCE_GET_STRUCTURE_ERROR";
    pub const PLUGIN_NOT_FOUND: &str = "PLUGIN_NOT_FOUND";
}

/// An error already classified by the plugin contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}[{code}]: {message}")]
pub struct PluginError {
    pub kind: PluginErrorKind,
    pub code: String,
    pub message: String,
}

impl PluginError {
    pub fn new(kind: PluginErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_query_settings(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::InvalidQuerySettings, code, message)
    }

    pub fn query_execution(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::QueryExecutionError, code, message)
    }
}

/// A business-level error raised by the host or a plugin. Never re-wrapped
/// by query execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct BizError {
    pub code: String,
    pub message: String,
}

impl BizError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Error type returned by plugin implementations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Biz(#[from] BizError),

    #[error("{0}")]
    Other(BoxError),
}

impl ExecutorError {
    /// Wraps any unclassified error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// Unclassified error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Other(message.into())
    }
}

impl From<tokio_postgres::Error> for ExecutorError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::other(err)
    }
}

impl From<tokio::time::error::Elapsed> for ExecutorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::other(err)
    }
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(err)
    }
}

/// Error observed by host callers of the contract. Only classified kinds
/// can be represented.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifiedError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Biz(#[from] BizError),
}

impl ClassifiedError {
    /// Returns the plugin error, if this is one.
    pub fn as_plugin(&self) -> Option<&PluginError> {
        match self {
            Self::Plugin(e) => Some(e),
            Self::Biz(_) => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Plugin(e) => &e.code,
            Self::Biz(e) => &e.code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Plugin(e) => &e.message,
            Self::Biz(e) => &e.message,
        }
    }

    /// Classifies an executor error, passing plugin and business errors
    /// through and wrapping anything else into `kind`/`code`.
    pub(crate) fn wrap(err: ExecutorError, kind: PluginErrorKind, code: &str) -> Self {
        match err {
            ExecutorError::Plugin(e) => Self::Plugin(e),
            ExecutorError::Biz(e) => Self::Biz(e),
            ExecutorError::Other(e) => Self::Plugin(PluginError::new(kind, code, e.to_string())),
        }
    }
}

/// Errors from the tabular result helpers.
#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Result data is not tabular")]
    NotTabular,

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Errors from resolving `{{ name }}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unterminated placeholder at byte {0}")]
    Unterminated(usize),

    #[error("Empty placeholder at byte {0}")]
    EmptyName(usize),

    #[error("Missing request parameter: {0}")]
    MissingVariable(String),
}

impl From<TemplateError> for ExecutorError {
    fn from(err: TemplateError) -> Self {
        Self::other(err)
    }
}

/// Result type alias for host-facing contract operations
pub type Result<T> = std::result::Result<T, ClassifiedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_passes_classified_errors_through() {
        let original = PluginError::invalid_query_settings("SOME_CODE", "bad");
        let wrapped = ClassifiedError::wrap(
            ExecutorError::Plugin(original.clone()),
            PluginErrorKind::QueryExecutionError,
            codes::QUERY_EXECUTION_ERROR,
        );
        assert_eq!(wrapped, ClassifiedError::Plugin(original));

        let biz = BizError::new("BIZ", "nope");
        let wrapped = ClassifiedError::wrap(
            ExecutorError::Biz(biz.clone()),
            PluginErrorKind::QueryExecutionError,
            codes::QUERY_EXECUTION_ERROR,
        );
        assert_eq!(wrapped, ClassifiedError::Biz(biz));
    }

    #[test]
    fn test_wrap_classifies_other_errors() {
        let wrapped = ClassifiedError::wrap(
            ExecutorError::msg("socket closed"),
            PluginErrorKind::QueryExecutionError,
            codes::QUERY_EXECUTION_ERROR,
        );
        let err = wrapped.as_plugin().unwrap();
        assert_eq!(err.kind, PluginErrorKind::QueryExecutionError);
        assert_eq!(err.code, "QUERY_EXECUTION_ERROR");
        assert_eq!(err.message, "socket closed");
    }

    #[test]
    fn test_display() {
        let err = PluginError::invalid_query_settings("QUERY_ARGUMENT_ERROR", "missing sql");
        assert_eq!(
            err.to_string(),
            "INVALID_QUERY_SETTINGS[QUERY_ARGUMENT_ERROR]: missing sql"
        );
    }
}
