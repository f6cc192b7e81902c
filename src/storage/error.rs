//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure, which can be
//! matched to determine the underlying cause (database, data, handle mode).

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid data in database (e.g., unparsable timestamp).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A write was attempted through a read-only handle.
    #[error("store was opened read-only")]
    ReadOnly,

    /// Internal error (e.g., failed to prepare the database directory).
    #[error("internal error: {0}")]
    Internal(String),
}
