//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};

use confstore::{Config, LegacyConfig, LegacyDatabase, LegacyRecord, StoreConfig, TypedStore};
use confstore_core::Value;
use tempfile::TempDir;

/// A store in a temporary directory, with room for a legacy database next
/// to it.
///
/// The watcher thread is disabled; call
/// [`TypedStore::refresh`](confstore_store::TypedStore::refresh) to pick up
/// commits from other handles.
pub struct TestFixture {
    pub dir: TempDir,
    pub store: TypedStore,
    config: Config,
}

impl TestFixture {
    /// A fresh, empty store.
    pub fn new() -> Self {
        Self::build(|_| {})
    }

    /// A store opened over a legacy database holding `builder`'s records.
    pub fn with_legacy(builder: LegacyDbBuilder) -> Self {
        Self::build(|path| builder.write(path))
    }

    fn build(prepare: impl FnOnce(&Path)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config {
            store: StoreConfig::new(dir.path().join("configuration.db")).poll_interval(None),
            legacy: Some(LegacyConfig::new(dir.path().join("legacy.db"))),
        };
        if let Some(legacy) = &config.legacy {
            prepare(&legacy.path);
        }
        let store = confstore::open(&config).expect("open store");
        Self { dir, store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.config.store.path
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.dir.path().join("legacy.db")
    }

    /// Another handle on the same database, as a second process would have.
    pub fn open_handle(&self) -> TypedStore {
        TypedStore::open(&self.config.store).expect("open second handle")
    }

    /// Drop the store and open it again.
    pub fn reopen(&mut self) {
        self.store = confstore::open(&self.config).expect("reopen store");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds legacy `KeyValuePair` databases.
#[derive(Debug, Clone, Default)]
pub struct LegacyDbBuilder {
    records: Vec<LegacyRecord>,
}

impl LegacyDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A well-formed record.
    pub fn value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.records.push(LegacyRecord::new(key, value.into()));
        self
    }

    /// A record declaring `value_type` with no value in any column.
    pub fn empty(mut self, key: &str, value_type: i64) -> Self {
        self.records.push(LegacyRecord {
            key: key.to_string(),
            value_type,
            ..LegacyRecord::default()
        });
        self
    }

    /// Any record, as given.
    pub fn record(mut self, record: LegacyRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn records(&self) -> &[LegacyRecord] {
        &self.records
    }

    /// Write the records to a new database at `path`.
    pub fn write(&self, path: &Path) {
        let db = LegacyDatabase::create(path).expect("create legacy database");
        for record in &self.records {
            db.insert(record).expect("insert legacy record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confstore::legacy::TYPE_LONG;

    #[test]
    fn test_fixture_handles_share_file() {
        let fixture = TestFixture::new();
        let other = fixture.open_handle();
        other.set("k", 1i32).unwrap();

        assert!(fixture.store.refresh().unwrap());
        assert_eq!(fixture.store.get::<i32>("k"), Some(1));
        assert!(fixture.store_path().exists());
    }

    #[test]
    fn test_fixture_with_legacy() {
        let fixture = TestFixture::with_legacy(
            LegacyDbBuilder::new()
                .value("mtu", 1500i64)
                .empty("broken", TYPE_LONG),
        );
        assert_eq!(fixture.store.get::<i64>("mtu"), Some(1500));
        assert!(!fixture.store.contains("broken"));
        assert!(!fixture.legacy_path().exists());
    }

    #[test]
    fn test_reopen_keeps_values() {
        let mut fixture = TestFixture::new();
        fixture.store.set("a", "b").unwrap();
        fixture.reopen();
        assert_eq!(fixture.store.get::<String>("a"), Some("b".into()));
    }
}
