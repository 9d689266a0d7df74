//! Error types for SQLite storage

use canopy_core::storage::StorageError;
use canopy_core::tree::TreeError;
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Nested-set operation rejected while rewriting a structure
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Connection(msg) => Self::Backend(msg),
            SqliteError::Query(msg) => Self::Backend(msg),
            SqliteError::Schema(msg) => Self::Backend(msg),
            SqliteError::NotFound(msg) => Self::NotFound(msg),
            SqliteError::InvalidOperation(msg) => Self::InvalidOperation(msg),
            SqliteError::Tree(e) => Self::Tree(e),
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(msg.unwrap_or_else(|| e.to_string()))
            }
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Self::Transaction(msg.unwrap_or_else(|| e.to_string()))
            }
            SqliteError::Rusqlite(e) => Self::Backend(e.to_string()),
        }
    }
}
