//! Proptest generators for property-based testing.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::Value as Json;

use confstore::LegacyRecord;
use confstore_core::{Tree, Value, ValueKind};

/// Generate a client key. Never reserved, never empty.
pub fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_map(String::from)
}

/// Generate a string set.
pub fn string_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z0-9.]{1,12}", 0..4)
}

/// Generate a storable value of any kind.
pub fn value() -> impl Strategy<Value = Value> {
    prop::sample::select(ValueKind::ALL.to_vec()).prop_flat_map(value_of)
}

/// Generate a value of one kind.
pub fn value_of(kind: ValueKind) -> BoxedStrategy<Value> {
    match kind {
        ValueKind::Boolean => any::<bool>().prop_map(Value::Boolean).boxed(),
        ValueKind::Float => (-1.0e9f32..1.0e9f32).prop_map(Value::Float).boxed(),
        ValueKind::Int => any::<i32>().prop_map(Value::Int).boxed(),
        ValueKind::Long => any::<i64>().prop_map(Value::Long).boxed(),
        ValueKind::String => "[ -~]{0,24}".prop_map(Value::String).boxed(),
        ValueKind::StringSet => string_set().prop_map(Value::StringSet).boxed(),
    }
}

/// Generate store contents.
pub fn entries() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(key(), value(), 0..16)
}

/// Generate a well-formed legacy record.
pub fn legacy_record() -> impl Strategy<Value = LegacyRecord> {
    (key(), value()).prop_map(|(key, value)| LegacyRecord::new(key, value))
}

/// Generate a JSON scalar, including null.
pub fn json_leaf() -> impl Strategy<Value = Json> {
    prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::from),
        any::<i64>().prop_map(Json::from),
        "[a-z]{0,8}".prop_map(Json::from),
    ]
}

/// Generate a nested JSON value without list-editing operators in its keys.
pub fn json_value() -> impl Strategy<Value = Json> {
    json_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|map| Json::Object(map.into_iter().collect())),
        ]
    })
}

/// Generate a config tree whose keys carry no operators.
pub fn plain_tree() -> impl Strategy<Value = Tree> {
    prop::collection::btree_map("[a-z]{1,6}", json_value(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

/// Generate a non-empty JSON list.
pub fn json_list() -> impl Strategy<Value = Vec<Json>> {
    prop::collection::vec(json_leaf().prop_filter("non-null", |v| !v.is_null()), 1..5)
}
