//! Backup export and import.
//!
//! A backup is a JSON object carrying a long `__version` and one value
//! holder per key:
//!
//! ```json
//! {
//!   "__version": 2,
//!   "proxy_port": { "type": 2, "value": 1080 },
//!   "bypass_apps": { "type": 5, "value": ["com.example"] }
//! }
//! ```
//!
//! Import replaces the whole store in one transaction. Anything wrong with
//! the document (version, holder shape, type tag) is reported before a
//! single key is written.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{Map, Value as Json};

use confstore_core::{is_reserved, Value, ValueKind, VERSION_KEY};
use confstore_store::TypedStore;

use crate::error::{Error, Result};
use crate::legacy::LegacyRecord;

/// The backup format version written and accepted by this crate.
pub const BACKUP_VERSION: i64 = 2;

const FIELD_TYPE: &str = "type";
const FIELD_VALUE: &str = "value";

/// A decoded backup document.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupDocument {
    pub version: i64,
    pub entries: BTreeMap<String, ValueHolder>,
}

/// One exported value: its kind tag and the raw JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueHolder {
    pub kind: ValueKind,
    pub value: Json,
}

impl ValueHolder {
    pub fn new(value: &Value) -> Self {
        Self {
            kind: value.kind(),
            value: value.to_json(),
        }
    }

    /// Decode the raw value strictly against the kind tag.
    pub fn decode(&self, key: &str) -> Result<Value> {
        Value::from_json(self.kind, &self.value).map_err(|e| Error::InvalidHolder {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn to_json(&self) -> Json {
        let mut holder = Map::new();
        holder.insert(FIELD_TYPE.into(), Json::from(self.kind.code()));
        holder.insert(FIELD_VALUE.into(), self.value.clone());
        Json::Object(holder)
    }

    fn from_json(key: &str, json: &Json) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidHolder {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let holder = json.as_object().ok_or_else(|| invalid("not an object"))?;
        let tag = holder
            .get(FIELD_TYPE)
            .ok_or_else(|| invalid("missing type"))?;
        let kind = ValueKind::from_tag(tag).map_err(|_| Error::UnknownType {
            key: key.to_string(),
            tag: tag.to_string(),
        })?;
        let value = holder
            .get(FIELD_VALUE)
            .ok_or_else(|| invalid("missing value"))?;
        Ok(Self {
            kind,
            value: value.clone(),
        })
    }
}

impl BackupDocument {
    /// A document at the current version.
    pub fn new(entries: BTreeMap<String, ValueHolder>) -> Self {
        Self {
            version: BACKUP_VERSION,
            entries,
        }
    }

    /// The wire form.
    pub fn to_json(&self) -> Json {
        let mut root = Map::new();
        root.insert(VERSION_KEY.into(), Json::from(self.version));
        for (key, holder) in &self.entries {
            root.insert(key.clone(), holder.to_json());
        }
        Json::Object(root)
    }

    /// Parse the wire form.
    ///
    /// The version must be present as a number or numeric string but is not
    /// compared here; [`BackupExt::import_document`] does that. Reserved keys are ignored.
    pub fn from_json(json: &Json) -> Result<Self> {
        let root = json
            .as_object()
            .ok_or_else(|| Error::InvalidDocument(format!("expected an object, got {}", json)))?;
        let version = document_version(root).ok_or(Error::VersionMismatch {
            expected: BACKUP_VERSION,
            found: None,
        })?;

        let entries = root
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, holder)| Ok((key.clone(), ValueHolder::from_json(key, holder)?)))
            .collect::<Result<_>>()?;

        Ok(Self { version, entries })
    }

    /// Check the version and decode every holder.
    pub fn decode(&self) -> Result<Vec<(String, Value)>> {
        check_version(Some(self.version))?;
        self.entries
            .iter()
            .map(|(key, holder)| Ok((key.clone(), holder.decode(key)?)))
            .collect()
    }
}

/// Read `__version` as a long: numbers are truncated and numeric strings
/// are parsed. Anything else counts as missing.
fn document_version(root: &Map<String, Json>) -> Option<i64> {
    match root.get(VERSION_KEY)? {
        Json::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Json::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn check_version(found: Option<i64>) -> Result<()> {
    if found == Some(BACKUP_VERSION) {
        Ok(())
    } else {
        Err(Error::VersionMismatch {
            expected: BACKUP_VERSION,
            found,
        })
    }
}

/// Backup operations on a store.
pub trait BackupExt {
    /// Every client-visible entry, tagged with the current version.
    fn export_document(&self) -> BackupDocument;

    /// The wire form of [`export_document`](BackupExt::export_document).
    fn export_json(&self) -> Json {
        self.export_document().to_json()
    }

    /// One `key: value` line per entry. For diagnostics only; not importable.
    fn export_display_string(&self) -> String;

    /// Replace the store contents with a wire-form backup.
    ///
    /// The version is checked before anything else. On any error the store
    /// is left as it was.
    fn import_json(&self, json: &Json) -> Result<()>;

    /// Replace the store contents with a decoded backup.
    fn import_document(&self, document: &BackupDocument) -> Result<()>;

    /// Replace the store contents with pre-versioned key/value pairs.
    ///
    /// A `__version` pair carrying a long must equal [`BACKUP_VERSION`].
    /// Pairs with an unknown type or no value for their type are skipped.
    fn import_legacy_pairs(&self, pairs: &[LegacyRecord]) -> Result<()>;
}

impl BackupExt for TypedStore {
    fn export_document(&self) -> BackupDocument {
        let entries = self
            .entries()
            .into_iter()
            .map(|(key, value)| (key, ValueHolder::new(&value)))
            .collect();
        BackupDocument::new(entries)
    }

    fn export_display_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.entries() {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        out
    }

    fn import_json(&self, json: &Json) -> Result<()> {
        let root = json
            .as_object()
            .ok_or_else(|| Error::InvalidDocument(format!("expected an object, got {}", json)))?;
        check_version(document_version(root))?;
        self.import_document(&BackupDocument::from_json(json)?)
    }

    fn import_document(&self, document: &BackupDocument) -> Result<()> {
        let values = document.decode()?;
        self.edit(|prefs| {
            prefs.clear();
            for (key, value) in &values {
                prefs.put(key, value.clone())?;
            }
            Ok::<(), Error>(())
        })?;
        tracing::info!(entries = values.len(), "imported backup");
        Ok(())
    }

    fn import_legacy_pairs(&self, pairs: &[LegacyRecord]) -> Result<()> {
        for pair in pairs.iter().filter(|pair| pair.key == VERSION_KEY) {
            if let Some(version) = pair.long {
                check_version(Some(version))?;
            }
        }

        let mut imported = 0;
        self.edit(|prefs| {
            imported = 0;
            prefs.clear();
            for pair in pairs.iter().filter(|pair| !is_reserved(&pair.key)) {
                let result = pair
                    .decode()
                    .and_then(|value| prefs.put(&pair.key, value).map_err(Error::from));
                match result {
                    Ok(()) => imported += 1,
                    Err(e) => tracing::warn!(key = %pair.key, error = %e, "skipping legacy pair"),
                }
            }
            Ok::<(), Error>(())
        })?;
        tracing::info!(imported, total = pairs.len(), "imported legacy pairs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use confstore_core::MIGRATION_KEY;
    use serde_json::json;

    use crate::legacy::{TYPE_LONG, TYPE_STRING};

    fn sample_store() -> TypedStore {
        let store = TypedStore::in_memory();
        let set: BTreeSet<String> = ["com.a".to_string(), "com.b".to_string()].into();
        store.set("enabled", true).unwrap();
        store.set("speed", 1.5f32).unwrap();
        store.set("proxy_port", 1080i32).unwrap();
        store.set("traffic", 1i64 << 35).unwrap();
        store.set("remote_dns", "https://dns.example/dns-query").unwrap();
        store.set("bypass_apps", set).unwrap();
        store
    }

    fn migrated(store: &TypedStore) {
        store
            .edit(|prefs| {
                prefs.mark_migrated();
                Ok::<(), Error>(())
            })
            .unwrap();
    }

    #[test]
    fn test_export_wire_form() {
        let store = TypedStore::in_memory();
        store.set("proxy_port", 1080i32).unwrap();
        store.set("bypass_apps", BTreeSet::from(["x".to_string()])).unwrap();
        migrated(&store);

        assert_eq!(
            store.export_json(),
            json!({
                "__version": 2,
                "proxy_port": {"type": 2, "value": 1080},
                "bypass_apps": {"type": 5, "value": ["x"]},
            })
        );
    }

    #[test]
    fn test_export_import_restores_entries() {
        let source = sample_store();
        let exported = source.export_json();

        let target = TypedStore::in_memory();
        target.set("stale", "gone").unwrap();
        target.import_json(&exported).unwrap();

        assert_eq!(target.entries(), source.entries());
        assert!(!target.contains("stale"));
    }

    #[test]
    fn test_version_mismatch_leaves_store_untouched() {
        let store = sample_store();
        let before = store.entries();

        for doc in [
            json!({"__version": 1, "a": {"type": 0, "value": true}}),
            json!({"__version": 3}),
            json!({"__version": "two"}),
            json!({"__version": null}),
            json!({"a": {"type": 0, "value": true}}),
        ] {
            assert!(matches!(
                store.import_json(&doc),
                Err(Error::VersionMismatch { expected: 2, .. })
            ));
        }
        assert_eq!(store.entries(), before);
    }

    #[test]
    fn test_version_coerced_like_a_long() {
        for version in [json!(2.0), json!("2"), json!(" 2 "), json!("2.0")] {
            let store = TypedStore::in_memory();
            store
                .import_json(&json!({"__version": version, "a": {"type": 0, "value": true}}))
                .unwrap();
            assert_eq!(store.get::<bool>("a"), Some(true));
        }

        let store = TypedStore::in_memory();
        assert!(matches!(
            store.import_json(&json!({"__version": "3"})),
            Err(Error::VersionMismatch { found: Some(3), .. })
        ));
        assert!(matches!(
            store.import_json(&json!({"__version": "two"})),
            Err(Error::VersionMismatch { found: None, .. })
        ));
    }

    #[test]
    fn test_version_checked_before_holders() {
        let store = TypedStore::in_memory();
        let doc = json!({"__version": 1, "a": "not a holder"});
        assert!(matches!(
            store.import_json(&doc),
            Err(Error::VersionMismatch { found: Some(1), .. })
        ));
    }

    #[test]
    fn test_malformed_holder_aborts_import() {
        let store = sample_store();
        let before = store.entries();

        let bad = [
            json!({"__version": 2, "ok": {"type": 0, "value": true}, "a": {"value": 1}}),
            json!({"__version": 2, "a": {"type": 2}}),
            json!({"__version": 2, "a": {"type": 0, "value": "yes"}}),
            json!({"__version": 2, "a": {"type": 2, "value": 1u64 << 40}}),
            json!({"__version": 2, "a": 5}),
        ];
        for doc in bad {
            assert!(matches!(
                store.import_json(&doc),
                Err(Error::InvalidHolder { .. })
            ));
        }
        assert_eq!(store.entries(), before);
    }

    #[test]
    fn test_unknown_type_tag() {
        let store = TypedStore::in_memory();
        let doc = json!({"__version": 2, "a": {"type": 9, "value": 1}});
        assert!(matches!(
            store.import_json(&doc),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_lenient_type_tags() {
        let store = TypedStore::in_memory();
        let doc = json!({
            "__version": 2,
            "a": {"type": "LONG", "value": 5},
            "b": {"type": 4.0, "value": "s"},
        });
        store.import_json(&doc).unwrap();
        assert_eq!(store.get::<i64>("a"), Some(5));
        assert_eq!(store.get::<String>("b"), Some("s".into()));
    }

    #[test]
    fn test_migration_flag_survives_and_is_not_imported() {
        let store = sample_store();
        migrated(&store);

        let doc = json!({
            "__version": 2,
            "__datastore_migrated_from_room__": {"type": 0, "value": false},
            "a": {"type": 0, "value": true},
        });
        store.import_json(&doc).unwrap();

        assert!(store.is_migrated());
        assert_eq!(store.entries(), vec![("a".to_string(), Value::Boolean(true))]);
        assert!(store.export_json().get(MIGRATION_KEY).is_none());
    }

    #[test]
    fn test_import_notifies_old_and_new_keys() {
        let store = TypedStore::in_memory();
        store.set("old", 1i32).unwrap();
        let seen = Arc::new(Mutex::new(BTreeSet::new()));
        let sink = Arc::clone(&seen);
        store.register_listener(Arc::new(move |_: &TypedStore, key: &str| {
            sink.lock().unwrap().insert(key.to_string());
        }));

        store
            .import_json(&json!({"__version": 2, "new": {"type": 0, "value": true}}))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.contains("old"));
        assert!(seen.contains("new"));
    }

    #[test]
    fn test_display_string() {
        let store = TypedStore::in_memory();
        store.set("a", true).unwrap();
        store.set("b", BTreeSet::from(["x".to_string(), "y".to_string()])).unwrap();
        migrated(&store);

        assert_eq!(store.export_display_string(), "a: true\nb: [x, y]\n");
    }

    #[test]
    fn test_legacy_pairs_skip_bad_records() {
        let store = TypedStore::in_memory();
        store.set("stale", 1i32).unwrap();

        let pairs = vec![
            LegacyRecord::new("mtu", Value::Int(9000)),
            LegacyRecord::new("name", Value::String("n".into())),
            LegacyRecord {
                key: "empty".into(),
                value_type: TYPE_STRING,
                ..LegacyRecord::default()
            },
            LegacyRecord {
                key: "weird".into(),
                value_type: 17,
                long: Some(1),
                ..LegacyRecord::default()
            },
        ];
        store.import_legacy_pairs(&pairs).unwrap();

        assert_eq!(store.get::<i64>("mtu"), Some(9000));
        assert_eq!(store.get::<String>("name"), Some("n".into()));
        assert!(!store.contains("empty"));
        assert!(!store.contains("weird"));
        assert!(!store.contains("stale"));
    }

    #[test]
    fn test_legacy_pairs_version_marker() {
        let store = sample_store();
        let before = store.entries();
        let marker = |version| LegacyRecord {
            key: VERSION_KEY.into(),
            value_type: TYPE_LONG,
            long: Some(version),
            ..LegacyRecord::default()
        };

        let pairs = vec![LegacyRecord::new("a", Value::Boolean(true)), marker(1)];
        assert!(matches!(
            store.import_legacy_pairs(&pairs),
            Err(Error::VersionMismatch { found: Some(1), .. })
        ));
        assert_eq!(store.entries(), before);

        let pairs = vec![LegacyRecord::new("a", Value::Boolean(true)), marker(2)];
        store.import_legacy_pairs(&pairs).unwrap();
        assert_eq!(store.entries(), vec![("a".to_string(), Value::Boolean(true))]);
    }

    #[test]
    fn test_legacy_pairs_empty_clears() {
        let store = sample_store();
        migrated(&store);
        store.import_legacy_pairs(&[]).unwrap();
        assert!(store.is_empty());
        assert!(store.is_migrated());
    }
}
