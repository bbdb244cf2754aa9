//! Error types for confstore Core.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors produced when converting between JSON and [`Value`](crate::Value).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("unknown value type tag: {0}")]
    UnknownKind(String),

    #[error("expected {expected:?} value, got {found}")]
    Mismatch { expected: ValueKind, found: String },

    #[error("{0:?} value is out of range: {1}")]
    OutOfRange(ValueKind, String),

    #[error("non-finite float: {0}")]
    NonFinite(f32),
}
