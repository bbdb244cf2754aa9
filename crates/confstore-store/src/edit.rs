//! The mutable view handed to [`TypedStore::edit`](crate::TypedStore::edit).

use std::collections::BTreeSet;

use confstore_core::{is_reserved, Value, MIGRATION_KEY};

use crate::error::{Result, StoreError};
use crate::traits::Snapshot;

/// A mutable view over the latest committed snapshot, valid for one write
/// transaction.
///
/// Every `put` and `remove` marks its key as touched, whether or not the
/// value actually changed. Touched keys are notified once the transaction
/// commits.
pub struct MutablePreferences<'a> {
    entries: &'a mut Snapshot,
    touched: BTreeSet<String>,
}

impl<'a> MutablePreferences<'a> {
    pub(crate) fn new(entries: &'a mut Snapshot) -> Self {
        Self {
            entries,
            touched: BTreeSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        if is_reserved(key) {
            return None;
        }
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Client-visible keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|key| !is_reserved(key))
    }

    pub fn put(&mut self, key: &str, value: Value) -> Result<()> {
        check_key(key)?;
        value.validate().map_err(|source| StoreError::InvalidValue {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), value);
        self.touched.insert(key.to_string());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        check_key(key)?;
        self.entries.remove(key);
        self.touched.insert(key.to_string());
        Ok(())
    }

    /// Remove every client-visible key. The migration flag survives.
    pub fn clear(&mut self) {
        let keys: Vec<String> = self.keys().map(str::to_string).collect();
        for key in keys {
            self.entries.remove(&key);
            self.touched.insert(key);
        }
    }

    /// Whether the legacy migration has completed.
    pub fn is_migrated(&self) -> bool {
        matches!(self.entries.get(MIGRATION_KEY), Some(Value::Boolean(true)))
    }

    /// Record that the legacy migration has completed. Not notified.
    pub fn mark_migrated(&mut self) {
        self.entries
            .insert(MIGRATION_KEY.to_string(), Value::Boolean(true));
    }

    pub(crate) fn into_touched(self) -> BTreeSet<String> {
        self.touched
    }
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    if is_reserved(key) {
        return Err(StoreError::ReservedKey(key.to_string()));
    }
    Ok(())
}
