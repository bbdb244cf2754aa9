//! TypedStore: the store handle shared by every consumer in a process.
//!
//! The handle is cheap to clone. Reads come from the last published
//! snapshot and never touch the database; writes go through a backend
//! transaction, publish the committed snapshot and then notify listeners.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tokio::sync::watch;

use confstore_core::{is_reserved, PreferenceValue, Value, MIGRATION_KEY};

use crate::config::StoreConfig;
use crate::edit::MutablePreferences;
use crate::error::{Result, StoreError};
use crate::listener::{ChangeListener, ListenerId, Listeners};
use crate::memory::MemoryBackend;
use crate::sqlite::SqliteBackend;
use crate::subscription::Subscription;
use crate::traits::{Backend, Snapshot};

/// A typed, observable preference store.
///
/// # Design Notes
///
/// - **Atomic writes**: every write is one backend transaction. Readers see
///   the previous snapshot until it commits.
/// - **Read-your-writes**: the committed snapshot is published before a
///   write returns.
/// - **Ordered publishing**: the write lock is held across commit and
///   publish, so snapshots are published in commit order.
/// - **Write-attempt notifications**: listeners fire once per key per write
///   call, after the write lock is released.
#[derive(Clone)]
pub struct TypedStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Box<dyn Backend>,
    write_lock: Mutex<()>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    listeners: Listeners,
}

impl TypedStore {
    /// Open the SQLite store described by `config`.
    ///
    /// Blocks until the initial snapshot is loaded. When a poll interval is
    /// configured, a watcher thread republishes commits made by other
    /// processes; it exits once every handle has been dropped.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let backend = SqliteBackend::open(&config.path, config.busy_timeout())?;
        let store = Self::with_backend(backend)?;
        if let Some(interval) = config.poll_duration() {
            store.spawn_watcher(interval)?;
        }
        tracing::debug!(path = %config.path.display(), keys = store.len(), "opened store");
        Ok(store)
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::from_parts(Box::new(MemoryBackend::new()), Snapshot::new())
    }

    /// A store over any backend.
    pub fn with_backend(backend: impl Backend + 'static) -> Result<Self> {
        let snapshot = backend.load()?;
        Ok(Self::from_parts(Box::new(backend), snapshot))
    }

    fn from_parts(backend: Box<dyn Backend>, snapshot: Snapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self {
            inner: Arc::new(Inner {
                backend,
                write_lock: Mutex::new(()),
                snapshot: tx,
                listeners: Listeners::default(),
            }),
        }
    }

    fn spawn_watcher(&self, interval: Duration) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        thread::Builder::new()
            .name("confstore-watch".into())
            .spawn(move || loop {
                thread::sleep(interval);
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = (TypedStore { inner }).refresh() {
                    tracing::warn!(error = %e, "failed to refresh store snapshot");
                }
            })?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Read `key` as `T`. Absent when missing or stored as another kind.
    pub fn get<T: PreferenceValue>(&self, key: &str) -> Option<T> {
        self.with_snapshot(|snapshot| visible(snapshot, key).and_then(T::from_value))
    }

    /// Read `key` as `T`, falling back to `default`.
    pub fn get_or<T: PreferenceValue>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Read the raw value of `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.with_snapshot(|snapshot| visible(snapshot, key).cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.with_snapshot(|snapshot| visible(snapshot, key).is_some())
    }

    /// Every client-visible entry, ordered by key.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.with_snapshot(|snapshot| {
            snapshot
                .iter()
                .filter(|(key, _)| !is_reserved(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// Number of client-visible entries.
    pub fn len(&self) -> usize {
        self.with_snapshot(|snapshot| snapshot.keys().filter(|key| !is_reserved(key)).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the legacy migration has completed.
    pub fn is_migrated(&self) -> bool {
        self.with_snapshot(|snapshot| {
            matches!(snapshot.get(MIGRATION_KEY), Some(Value::Boolean(true)))
        })
    }

    fn with_snapshot<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let snapshot = self.inner.snapshot.borrow();
        f(&snapshot)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Store `value` under `key`; `None` removes the key.
    pub fn put<V: Into<Value>>(&self, key: &str, value: Option<V>) -> Result<()> {
        match value {
            Some(value) => self.set(key, value),
            None => self.remove(key),
        }
    }

    /// Store `value` under `key`, replacing any previous value and kind.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.edit(|prefs| prefs.put(key, value.clone()))
    }

    /// Remove `key`. Listeners are notified even if it was absent.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.edit(|prefs| prefs.remove(key))
    }

    /// Remove every entry in one transaction.
    pub fn reset(&self) -> Result<()> {
        self.edit::<_, StoreError>(|prefs| {
            prefs.clear();
            Ok(())
        })
    }

    /// Apply several changes in one atomic transaction.
    ///
    /// `f` sees the latest committed state, including commits from other
    /// processes. If it returns an error nothing is committed and the error
    /// is returned as is. Touched keys are notified after commit.
    pub fn edit<F, E>(&self, mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&mut MutablePreferences<'_>) -> std::result::Result<(), E>,
        E: From<StoreError>,
    {
        let touched = {
            let _guard = self.write_guard();

            let mut touched = BTreeSet::new();
            let mut aborted = None;
            let committed = self.inner.backend.transact(&mut |entries: &mut Snapshot| {
                let mut prefs = MutablePreferences::new(entries);
                match f(&mut prefs) {
                    Ok(()) => {
                        touched = prefs.into_touched();
                        Ok(())
                    }
                    Err(e) => {
                        aborted = Some(e);
                        Err(StoreError::Aborted)
                    }
                }
            });

            let committed = match committed {
                Ok(committed) => committed,
                Err(e) => return Err(aborted.take().unwrap_or_else(|| E::from(e))),
            };

            tracing::debug!(touched = touched.len(), "committed edit");
            self.inner.snapshot.send_replace(Arc::new(committed));
            touched
        };

        self.notify(&touched);
        Ok(())
    }

    /// Publish commits made by other processes.
    ///
    /// Returns whether the published snapshot changed. Called periodically by
    /// the watcher thread; listeners are not notified.
    pub fn refresh(&self) -> Result<bool> {
        let _guard = self.write_guard();

        if !self.inner.backend.changed_externally()? {
            return Ok(false);
        }

        let latest = self.inner.backend.load()?;
        let changed = self.inner.snapshot.send_if_modified(|current| {
            if **current == latest {
                false
            } else {
                *current = Arc::new(latest);
                true
            }
        });
        if changed {
            tracing::debug!("picked up external changes");
        }
        Ok(changed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to the value of `key`, reading `default` while it is absent.
    pub fn subscribe<T: PreferenceValue>(&self, key: &str, default: T) -> Subscription<T> {
        Subscription::new(self.inner.snapshot.subscribe(), key, default)
    }

    pub fn register_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.inner.listeners.register(listener)
    }

    /// Returns whether the listener was registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.unregister(id)
    }

    // The lock guards no data and a panicking edit rolls its transaction
    // back, so a poisoned lock is still usable.
    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, keys: &BTreeSet<String>) {
        if keys.is_empty() {
            return;
        }
        let listeners = self.inner.listeners.snapshot();
        for key in keys {
            for listener in &listeners {
                listener.on_preference_changed(self, key);
            }
        }
    }
}

fn visible<'a>(snapshot: &'a Snapshot, key: &str) -> Option<&'a Value> {
    if is_reserved(key) {
        None
    } else {
        snapshot.get(key)
    }
}

impl fmt::Debug for TypedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStore")
            .field("entries", &self.len())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}
