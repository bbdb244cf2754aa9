//! Error types for the store module.

use confstore_core::ValueError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Keys must be non-empty.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// The key belongs to the store itself.
    #[error("reserved key: {0}")]
    ReservedKey(String),

    /// The value cannot be stored durably.
    #[error("invalid value for key {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: ValueError,
    },

    /// Stored data could not be decoded.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// An edit was abandoned by its caller; nothing was committed.
    #[error("edit aborted")]
    Aborted,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
