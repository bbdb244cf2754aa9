//! In-memory implementation of the Backend trait.
//!
//! This is primarily for testing. It has the same commit semantics as SQLite
//! but keeps everything in memory with no persistence and no other writers.

use std::sync::RwLock;

use crate::error::Result;
use crate::traits::{Backend, Snapshot, Transform};

/// In-memory backend.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock.
pub struct MemoryBackend {
    inner: RwLock<Snapshot>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::new())
    }

    /// Create a backend holding `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> Result<Snapshot> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.clone())
    }

    fn transact(&self, transform: &mut Transform<'_>) -> Result<Snapshot> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        // Work on a copy so a failed transform leaves nothing behind.
        let mut next = inner.clone();
        transform(&mut next)?;
        *inner = next.clone();
        Ok(next)
    }

    fn changed_externally(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use confstore_core::Value;

    #[test]
    fn test_transact_commits() {
        let backend = MemoryBackend::new();
        let committed = backend
            .transact(&mut |snapshot| {
                snapshot.insert("mtu".into(), Value::Int(9000));
                Ok(())
            })
            .unwrap();
        assert_eq!(committed.get("mtu"), Some(&Value::Int(9000)));
        assert_eq!(backend.load().unwrap(), committed);
    }

    #[test]
    fn test_failed_transform_rolls_back() {
        let backend = MemoryBackend::new();
        let result = backend.transact(&mut |snapshot| {
            snapshot.insert("mtu".into(), Value::Int(9000));
            Err(StoreError::Aborted)
        });
        assert!(matches!(result, Err(StoreError::Aborted)));
        assert!(backend.load().unwrap().is_empty());
    }
}
