//! One-shot migration from the legacy `KeyValuePair` database.
//!
//! The migration runs when a store is opened and does nothing once the
//! store's migration flag is set. It never fails: unreadable or malformed
//! records are logged and counted, and the flag is set regardless so the
//! migration is not attempted again. The legacy file is deleted only once
//! the flag is committed.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use confstore_core::Value;
use confstore_store::{StoreError, TypedStore};

use crate::error::{Error, Result};
use crate::legacy::{LegacyDatabase, LegacyRecord};

/// Where to find the legacy database and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyConfig {
    /// The legacy database file.
    pub path: PathBuf,
    /// Keys whose legacy String values hold numbers and are migrated as
    /// Long.
    #[serde(default)]
    pub string_to_long_keys: BTreeSet<String>,
}

impl LegacyConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            string_to_long_keys: BTreeSet::new(),
        }
    }

    pub fn with_string_to_long_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_to_long_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// What a call to [`run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set; nothing was read or written.
    AlreadyMigrated,
    /// There was no legacy database; only the flag was set.
    NoLegacyStore,
    /// Legacy records were imported.
    Migrated(MigrationReport),
}

/// Record counts for a migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
}

/// Migrate the legacy database into `store`, once.
pub fn run(store: &TypedStore, config: &LegacyConfig) -> MigrationOutcome {
    if store.is_migrated() {
        return MigrationOutcome::AlreadyMigrated;
    }

    if !config.path.exists() {
        tracing::info!(path = %config.path.display(), "no legacy database found, skipping migration");
        return match mark_migrated(store) {
            Ok(true) => MigrationOutcome::AlreadyMigrated,
            Ok(false) | Err(_) => MigrationOutcome::NoLegacyStore,
        };
    }

    let records = match read_records(&config.path) {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(path = %config.path.display(), error = %e, "legacy database is unreadable");
            Vec::new()
        }
    };
    tracing::info!(count = records.len(), "migrating legacy preferences");

    let mut report = MigrationReport {
        total: records.len(),
        ..MigrationReport::default()
    };
    let mut already = false;
    let committed = store.edit(|prefs| {
        report.migrated = 0;
        report.failed = 0;
        already = prefs.is_migrated();
        if already {
            return Ok(());
        }
        for record in &records {
            let result = record
                .as_ref()
                .map_err(|e| e.to_string())
                .and_then(|record| {
                    translate(record, config)
                        .and_then(|value| prefs.put(&record.key, value).map_err(Error::from))
                        .map_err(|e| e.to_string())
                });
            match result {
                Ok(()) => report.migrated += 1,
                Err(reason) => {
                    report.failed += 1;
                    tracing::warn!(%reason, "failed to migrate legacy record");
                }
            }
        }
        prefs.mark_migrated();
        Ok::<(), StoreError>(())
    });

    if let Err(e) = committed {
        tracing::error!(error = %e, "failed to commit migrated preferences");
        report.migrated = 0;
        report.failed = report.total;
        match mark_migrated(store) {
            Ok(flag_was_set) => already = flag_was_set,
            Err(_) => {
                // Without the flag the next open retries, so it needs the file.
                tracing::warn!(path = %config.path.display(), "keeping legacy database for the next attempt");
                return MigrationOutcome::Migrated(report);
            }
        }
    }
    if already {
        return MigrationOutcome::AlreadyMigrated;
    }

    tracing::info!(
        migrated = report.migrated,
        total = report.total,
        failed = report.failed,
        "migrated legacy preferences"
    );
    cleanup(&config.path);
    MigrationOutcome::Migrated(report)
}

fn read_records(path: &Path) -> Result<Vec<Result<LegacyRecord>>> {
    LegacyDatabase::open(path)?.records()
}

fn translate(record: &LegacyRecord, config: &LegacyConfig) -> Result<Value> {
    match record.decode()? {
        Value::String(s) if config.string_to_long_keys.contains(&record.key) => s
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| Error::NotALong {
                key: record.key.clone(),
                value: s,
            }),
        value => Ok(value),
    }
}

/// Set the flag on its own. Returns whether it was already set.
fn mark_migrated(store: &TypedStore) -> std::result::Result<bool, StoreError> {
    let mut already = false;
    store
        .edit(|prefs| {
            already = prefs.is_migrated();
            prefs.mark_migrated();
            Ok::<(), StoreError>(())
        })
        .map_err(|e| {
            tracing::error!(error = %e, "failed to set migration flag");
            e
        })?;
    Ok(already)
}

/// Delete the legacy database and its journal files. Failures are logged.
pub fn cleanup(path: &Path) {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut sibling = path.as_os_str().to_owned();
        sibling.push(suffix);
        files.push(PathBuf::from(sibling));
    }

    for file in files {
        match fs::remove_file(&file) {
            Ok(()) => tracing::info!(path = %file.display(), "deleted legacy database file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "failed to delete legacy database file")
            }
        }
    }
}
