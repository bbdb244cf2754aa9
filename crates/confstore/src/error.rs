//! Error types for confstore.

use confstore_core::ValueKind;
use confstore_store::StoreError;
use thiserror::Error;

/// Errors that can occur during backup, import and migration.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The backup was written by an incompatible version.
    #[error("backup version mismatch: expected {expected}, found {found:?}")]
    VersionMismatch { expected: i64, found: Option<i64> },

    /// The backup is not a JSON object.
    #[error("invalid backup document: {0}")]
    InvalidDocument(String),

    /// A value holder is malformed or does not match its type tag.
    #[error("invalid value holder for key {key}: {reason}")]
    InvalidHolder { key: String, reason: String },

    /// A value holder's type tag names no known kind.
    #[error("unknown value type {tag} for key {key}")]
    UnknownType { key: String, tag: String },

    /// A legacy record declares a type code outside the known set.
    #[error("unknown legacy value type {code} for key {key}")]
    UnknownLegacyType { key: String, code: i64 },

    /// A legacy record has no value for its declared type.
    #[error("legacy record {key} has no {kind} value")]
    MissingLegacyValue { key: String, kind: ValueKind },

    /// A legacy string could not be read as a long.
    #[error("legacy value {value:?} for key {key} is not a long")]
    NotALong { key: String, value: String },

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading the legacy database.
    #[error("legacy database error: {0}")]
    Legacy(#[from] rusqlite::Error),
}

/// Result type for confstore operations.
pub type Result<T> = std::result::Result<T, Error>;
