//! # confstore Core
//!
//! Pure primitives for confstore: the typed preference value model and the
//! configuration tree merge.
//!
//! This crate contains no I/O and no storage. Everything here is plain
//! computation over values and JSON trees.
//!
//! ## Key Types
//!
//! - [`Value`] - A stored preference value (closed over six kinds)
//! - [`ValueKind`] - The type tag of a value, shared by storage and backups
//! - [`PreferenceValue`] - Typed conversion between Rust types and [`Value`]
//!
//! ## Merge
//!
//! Override trees are layered onto base templates with [`merge`], which
//! understands the `+key` (prepend) and `key+` (append) list operators. See
//! the [`merge`](mod@merge) module.

pub mod error;
pub mod keys;
pub mod merge;
pub mod value;

pub use error::ValueError;
pub use keys::{is_reserved, MIGRATION_KEY, VERSION_KEY};
pub use merge::{merge, merge_into, Tree};
pub use value::{PreferenceValue, Value, ValueKind};
