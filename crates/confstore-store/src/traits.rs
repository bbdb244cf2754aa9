//! Backend trait: the abstract interface for snapshot persistence.
//!
//! A backend stores one flat map of preferences and commits changes to it
//! atomically. Implementations include SQLite (primary, multi-process) and
//! in-memory (for tests).

use std::collections::BTreeMap;

use confstore_core::Value;

use crate::error::Result;

/// The committed contents of a store.
pub type Snapshot = BTreeMap<String, Value>;

/// A transform applied to the latest committed snapshot inside a write
/// transaction.
pub type Transform<'a> = dyn FnMut(&mut Snapshot) -> Result<()> + 'a;

/// The Backend trait: synchronous interface for snapshot persistence.
///
/// # Design Notes
///
/// - **Atomic commits**: `transact` either commits the whole transformed
///   snapshot or nothing. A transform error rolls back.
/// - **Latest state**: `transact` hands the transform the latest committed
///   state, including commits made by other processes, and holds the writer
///   lock until it returns.
/// - **External changes**: `changed_externally` is cheap and reports whether
///   another connection committed since this one last looked.
pub trait Backend: Send + Sync {
    /// Load the committed snapshot.
    fn load(&self) -> Result<Snapshot>;

    /// Apply `transform` to the latest snapshot and commit it.
    ///
    /// Returns the committed snapshot.
    fn transact(&self, transform: &mut Transform<'_>) -> Result<Snapshot>;

    /// Whether another writer committed since the last load or commit.
    fn changed_externally(&self) -> Result<bool>;
}
