//! Property tests over stores, backups, migration and config merging.

use proptest::prelude::*;
use serde_json::{json, Value as Json};

use confstore::{merge, BackupExt, MigrationOutcome, MigrationReport, Tree, TypedStore};
use confstore_testkit::generators::{entries, json_list, legacy_record, plain_tree};
use confstore_testkit::{LegacyDbBuilder, TestFixture};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn entries_survive_reopen(entries in entries()) {
        let mut fixture = TestFixture::new();
        fixture.store.edit(|prefs| {
            for (key, value) in &entries {
                prefs.put(key, value.clone())?;
            }
            Ok::<(), confstore_store::StoreError>(())
        }).unwrap();

        fixture.reopen();

        let stored: Vec<_> = entries.into_iter().collect();
        prop_assert_eq!(fixture.store.entries(), stored);
    }

    #[test]
    fn export_import_is_idempotent(entries in entries()) {
        let source = TypedStore::in_memory();
        for (key, value) in &entries {
            source.set(key, value.clone()).unwrap();
        }
        let exported = source.export_json();

        let target = TypedStore::in_memory();
        target.import_json(&exported).unwrap();
        prop_assert_eq!(target.entries(), source.entries());
        prop_assert_eq!(target.export_json(), exported);
    }

    #[test]
    fn migration_isolates_malformed_records(records in prop::collection::vec(legacy_record(), 0..12)) {
        let mut builder = LegacyDbBuilder::new();
        let mut keys = std::collections::BTreeSet::new();
        for record in records {
            if keys.insert(record.key.clone()) {
                builder = builder.record(record);
            }
        }
        let valid = keys.len();
        builder = builder.empty("broken-record", confstore::legacy::TYPE_STRING);

        let fixture = TestFixture::with_legacy(builder);

        prop_assert!(fixture.store.is_migrated());
        prop_assert_eq!(fixture.store.len(), valid);
        prop_assert!(!fixture.store.contains("broken-record"));
    }

    #[test]
    fn merging_empty_tree_is_identity(into in plain_tree()) {
        prop_assert_eq!(merge(&Tree::new(), into.clone()), into);
    }

    #[test]
    fn plain_merge_is_idempotent(from in plain_tree(), into in plain_tree()) {
        let once = merge(&from, into);
        let twice = merge(&from, once.clone());
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn append_and_prepend_concatenate(existing in json_list(), items in json_list()) {
        let into: Tree = [("k".to_string(), Json::Array(existing.clone()))].into_iter().collect();

        let appended = merge(&tree(json!({"k+": items.clone()})), into.clone());
        let mut expected = existing.clone();
        expected.extend(items.iter().cloned());
        prop_assert_eq!(&appended["k"], &Json::Array(expected));

        let prepended = merge(&tree(json!({"+k": items.clone()})), into.clone());
        let mut expected = items.clone();
        expected.extend(existing.iter().cloned());
        prop_assert_eq!(&prepended["k"], &Json::Array(expected));

        let untouched = merge(&tree(json!({"+k+": items})), into.clone());
        prop_assert_eq!(untouched, into);
    }
}

#[test]
fn migration_reports_counts() {
    let fixture = TestFixture::new();
    let path = fixture.dir.path().join("another.db");
    LegacyDbBuilder::new()
        .value("a", true)
        .value("b", "x")
        .empty("c", 3)
        .write(&path);

    let store = TypedStore::in_memory();
    let outcome = confstore::migrate::run(&store, &confstore::LegacyConfig::new(&path));
    assert_eq!(
        outcome,
        MigrationOutcome::Migrated(MigrationReport {
            total: 3,
            migrated: 2,
            failed: 1
        })
    );
}

fn tree(value: Json) -> Tree {
    match value {
        Json::Object(map) => map,
        _ => panic!("expected an object"),
    }
}
