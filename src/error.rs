use thiserror::Error;

/// Error type for sqlrun operations
#[derive(Debug, Error)]
pub enum SqlRunError {
    /// The statement producer failed to render a query.
    #[error("Failed to build statement: {0}")]
    Build(String),

    /// The backing client has no notion of the requested operation.
    #[error("{operation} is not supported by {driver}")]
    Unsupported {
        operation: &'static str,
        driver: &'static str,
    },

    #[error("no field descriptions")]
    NoFieldDescriptions,

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("no rows in result set")]
    NoRows,

    #[error("scan called without a current row")]
    NoCurrentRow,

    #[error("rows are closed")]
    RowsClosed,

    #[error("expected {expected} destination arguments in scan, not {actual}")]
    ScanArity { expected: usize, actual: usize },

    #[error("cannot scan {value} value in column {column} into {target}")]
    ScanType {
        column: usize,
        value: &'static str,
        target: &'static str,
    },

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Any other client error, passed through untouched.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),
}

impl SqlRunError {
    pub fn build(message: impl Into<String>) -> Self {
        SqlRunError::Build(message.into())
    }

    pub fn driver(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SqlRunError::Driver(err.into())
    }

    /// True for the errors a cancelled or expired context produces.
    pub fn is_context_error(&self) -> bool {
        matches!(self, SqlRunError::Canceled | SqlRunError::DeadlineExceeded)
    }
}

/// Result type alias for sqlrun operations
pub type Result<T> = std::result::Result<T, SqlRunError>;
