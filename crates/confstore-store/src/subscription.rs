//! Reactive per-key subscriptions.

use std::sync::Arc;

use tokio::sync::watch;

use confstore_core::{is_reserved, PreferenceValue};

use crate::traits::Snapshot;

/// A de-duplicated stream of one key's value.
///
/// The first call to [`next`](Subscription::next) yields the current value;
/// later calls wait for a different value. Intermediate values may be
/// skipped when several commits land between polls. Commits from other
/// processes arrive once the store's watcher (or an explicit
/// [`refresh`](crate::TypedStore::refresh)) picks them up.
pub struct Subscription<T> {
    rx: watch::Receiver<Arc<Snapshot>>,
    key: String,
    default: T,
    last: Option<T>,
}

impl<T: PreferenceValue> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<Arc<Snapshot>>, key: &str, default: T) -> Self {
        Self {
            rx,
            key: key.to_string(),
            default,
            last: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value in the latest published snapshot.
    pub fn current(&self) -> T {
        read(&self.rx.borrow(), &self.key, &self.default)
    }

    /// Wait for the next distinct value.
    ///
    /// Returns `None` once every handle to the store has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let value = read(&self.rx.borrow_and_update(), &self.key, &self.default);
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

fn read<T: PreferenceValue>(snapshot: &Snapshot, key: &str, default: &T) -> T {
    if is_reserved(key) {
        return default.clone();
    }
    snapshot
        .get(key)
        .and_then(T::from_value)
        .unwrap_or_else(|| default.clone())
}
