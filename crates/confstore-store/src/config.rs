//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MIN_POLL_MS: u64 = 1;

/// Configuration for a SQLite-backed [`TypedStore`](crate::TypedStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backing database file, shared by every process using the store.
    pub path: PathBuf,
    /// How often to look for commits made by other processes.
    ///
    /// `None` disables the watcher thread; call
    /// [`TypedStore::refresh`](crate::TypedStore::refresh) instead. Intervals
    /// below one millisecond are treated as one millisecond.
    pub poll_interval_ms: Option<u64>,
    /// How long a writer waits for another process's write lock.
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Default settings for the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the cross-process poll interval.
    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval_ms = interval.map(|d| {
            u64::try_from(d.as_millis())
                .unwrap_or(u64::MAX)
                .max(MIN_POLL_MS)
        });
        self
    }

    pub(crate) fn poll_duration(&self) -> Option<Duration> {
        self.poll_interval_ms
            .map(|ms| Duration::from_millis(ms.max(MIN_POLL_MS)))
    }

    pub(crate) fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("configuration.db"),
            poll_interval_ms: Some(200),
            busy_timeout_ms: 5_000,
        }
    }
}
