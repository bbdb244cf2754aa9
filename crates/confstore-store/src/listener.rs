//! Raw change listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::typed::TypedStore;

/// Receives a callback after every committed write attempt on a key.
///
/// This is a "write occurred" signal: it fires for a `put` of the value
/// already stored and for a `remove` of an absent key. Callbacks run
/// synchronously on the writing thread, after the store's write lock has been
/// released. Commits made by other processes do not call listeners; use
/// [`TypedStore::subscribe`] to observe those.
pub trait ChangeListener: Send + Sync {
    fn on_preference_changed(&self, store: &TypedStore, key: &str);
}

impl<F> ChangeListener for F
where
    F: Fn(&TypedStore, &str) + Send + Sync,
{
    fn on_preference_changed(&self, store: &TypedStore, key: &str) {
        self(store, key)
    }
}

/// Handle returned by [`TypedStore::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The listener set, guarded by its own lock.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Arc<dyn ChangeListener>)>>,
}

impl Listeners {
    pub(crate) fn register(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Copy of the current set, so callbacks run without the lock held.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    // The list is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Arc<dyn ChangeListener>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
