use thiserror::Error;

// ---------------------------------------------------------------------------
// DataError – every recoverable failure of the data core
// ---------------------------------------------------------------------------

/// Errors raised by loading, classification and queries.
///
/// None of these are fatal: the caller turns them into a user-visible notice
/// and degrades the one view that asked. `Clone` so a cached failed load can
/// be handed to every reader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("data source unavailable: {0}")]
    DataUnavailable(String),

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("duplicate Student_ID {0}")]
    DuplicateIdentifier(i64),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("need at least 2 valid numeric columns, got {0}")]
    InsufficientColumns(usize),

    #[error("no student with id {0}")]
    RowNotFound(i64),
}

pub type DataResult<T> = Result<T, DataError>;
