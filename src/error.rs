use thiserror::Error;

/// Error type for sqlhooks operations
#[derive(Debug, Error)]
pub enum SqlHooksError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Expected {expected} argument(s), got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("{0} is closed")]
    Closed(&'static str),

    #[error("No driver registered under name: {0}")]
    DriverNotFound(String),

    #[error("A driver is already registered under name: {0}")]
    DuplicateDriver(String),

    #[error("Statement aborted by hook: {0}")]
    Aborted(String),
}

impl SqlHooksError {
    /// Create a query failure from any displayable message
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Check if this error was raised by a before-hook rather than the driver
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Result type alias for sqlhooks operations
pub type Result<T> = std::result::Result<T, SqlHooksError>;
