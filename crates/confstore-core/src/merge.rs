//! Configuration tree merge.
//!
//! Layers an override tree onto a base tree. Keys may carry a list-editing
//! operator:
//!
//! | key form | effect on `into[key]`                                    |
//! |----------|----------------------------------------------------------|
//! | `key`    | recursive merge for two mappings, otherwise replace      |
//! | `+key`   | prepend `from` items to the existing list                |
//! | `key+`   | append `from` items to the existing list                 |
//! | `+key+`  | nothing                                                  |
//!
//! For the list operators the existing value is coerced to a list first: an
//! absent key is an empty list and a scalar is a one-element list. A
//! non-list operand on the `from` side is likewise a one-element list, and an
//! empty operand list leaves `into` untouched.
//!
//! The rules apply independently at every nesting level.

use serde_json::{Map, Value as Json};

/// A nested configuration tree.
pub type Tree = Map<String, Json>;

/// Merge `from` into `into`, returning the merged tree.
pub fn merge(from: &Tree, mut into: Tree) -> Tree {
    merge_into(from, &mut into);
    into
}

/// Merge `from` into `into` in place.
pub fn merge_into(from: &Tree, into: &mut Tree) {
    for (key, value) in from {
        if value.is_null() {
            continue;
        }

        match KeyOp::parse(key) {
            KeyOp::Set(key) => set(into, key, value),
            KeyOp::Prepend(key) => {
                let items = operand(value);
                if items.is_empty() {
                    continue;
                }
                let mut list = items;
                list.extend(take_list(into, key));
                into.insert(key.to_string(), Json::Array(list));
            }
            KeyOp::Append(key) => {
                let items = operand(value);
                if items.is_empty() {
                    continue;
                }
                let mut list = take_list(into, key);
                list.extend(items);
                into.insert(key.to_string(), Json::Array(list));
            }
            // `+key+` names neither operator.
            KeyOp::Both => {}
        }
    }
}

enum KeyOp<'a> {
    Set(&'a str),
    Prepend(&'a str),
    Append(&'a str),
    Both,
}

impl<'a> KeyOp<'a> {
    fn parse(key: &'a str) -> Self {
        match (key.strip_prefix('+'), key.strip_suffix('+')) {
            (Some(_), Some(_)) => KeyOp::Both,
            (Some(base), None) => KeyOp::Prepend(base),
            (None, Some(base)) => KeyOp::Append(base),
            (None, None) => KeyOp::Set(key),
        }
    }
}

fn set(into: &mut Tree, key: &str, value: &Json) {
    match (value, into.get_mut(key)) {
        (Json::Object(from), Some(Json::Object(existing))) => merge_into(from, existing),
        (Json::Object(from), _) => {
            let mut fresh = Tree::new();
            merge_into(from, &mut fresh);
            into.insert(key.to_string(), Json::Object(fresh));
        }
        (value, _) => {
            into.insert(key.to_string(), value.clone());
        }
    }
}

fn operand(value: &Json) -> Vec<Json> {
    match value {
        Json::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn take_list(into: &mut Tree, key: &str) -> Vec<Json> {
    match into.remove(key) {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items,
        Some(other) => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Json) -> Tree {
        match value {
            Json::Object(map) => map,
            _ => panic!("test tree must be an object"),
        }
    }

    #[test]
    fn test_adds_missing_keys() {
        let merged = merge(&tree(json!({"name": "Alice", "age": 30})), Tree::new());
        assert_eq!(merged["name"], json!("Alice"));
        assert_eq!(merged["age"], json!(30));
    }

    #[test]
    fn test_overwrites_scalars() {
        let merged = merge(&tree(json!({"name": "Alice"})), tree(json!({"name": "Bob"})));
        assert_eq!(merged["name"], json!("Alice"));
    }

    #[test]
    fn test_null_is_skipped() {
        let into = tree(json!({"name": "Bob", "city": "Paris"}));
        let merged = merge(&tree(json!({"name": null, "age": 30})), into);
        assert_eq!(merged["name"], json!("Bob"));
        assert_eq!(merged["city"], json!("Paris"));
        assert_eq!(merged["age"], json!(30));
    }

    #[test]
    fn test_nested_maps_merge_recursively() {
        let into = tree(json!({"address": {"city": "London", "zip": "SW1"}}));
        let from = tree(json!({"address": {"street": "Baker St", "city": "Paris"}}));
        let merged = merge(&from, into);
        assert_eq!(
            merged["address"],
            json!({"city": "Paris", "zip": "SW1", "street": "Baker St"})
        );
    }

    #[test]
    fn test_map_replaces_scalar_and_scalar_replaces_map() {
        let merged = merge(
            &tree(json!({"address": {"city": "Paris"}, "dns": "local"})),
            tree(json!({"address": "old", "dns": {"servers": []}})),
        );
        assert_eq!(merged["address"], json!({"city": "Paris"}));
        assert_eq!(merged["dns"], json!("local"));
    }

    #[test]
    fn test_plain_list_replaces() {
        let merged = merge(&tree(json!({"items": [3, 4]})), tree(json!({"items": [1, 2]})));
        assert_eq!(merged["items"], json!([3, 4]));
    }

    #[test]
    fn test_prepend() {
        let merged = merge(&tree(json!({"+items": [0]})), tree(json!({"items": [1, 2]})));
        assert_eq!(merged["items"], json!([0, 1, 2]));
        assert!(!merged.contains_key("+items"));
    }

    #[test]
    fn test_append() {
        let merged = merge(&tree(json!({"items+": [3, 4]})), tree(json!({"items": [1, 2]})));
        assert_eq!(merged["items"], json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_dual_operator_is_noop() {
        let merged = merge(&tree(json!({"+items+": [2]})), tree(json!({"items": [1]})));
        assert_eq!(merged["items"], json!([1]));
        assert_eq!(merged.len(), 1);

        let merged = merge(&tree(json!({"+": [2]})), tree(json!({"items": [1]})));
        assert_eq!(merged, tree(json!({"items": [1]})));
    }

    #[test]
    fn test_scalar_coerced_to_list() {
        let merged = merge(&tree(json!({"+value": "new"})), tree(json!({"value": "original"})));
        assert_eq!(merged["value"], json!(["new", "original"]));

        let merged = merge(&tree(json!({"value+": ["new"]})), tree(json!({"value": 1})));
        assert_eq!(merged["value"], json!([1, "new"]));
    }

    #[test]
    fn test_operator_on_absent_key() {
        let merged = merge(&tree(json!({"+items": [1], "rules+": "r"})), Tree::new());
        assert_eq!(merged["items"], json!([1]));
        assert_eq!(merged["rules"], json!(["r"]));
    }

    #[test]
    fn test_empty_operand_is_noop() {
        let merged = merge(&tree(json!({"+items": [], "other+": []})), tree(json!({"items": "x"})));
        assert_eq!(merged, tree(json!({"items": "x"})));
    }

    #[test]
    fn test_nested_operators() {
        let into = tree(json!({"nested": {"items": ["A", "B"]}}));
        let from = tree(json!({"nested": {"+items": ["!"], "items+": ["C"]}}));
        let merged = merge(&from, into);
        assert_eq!(merged["nested"]["items"], json!(["!", "A", "B", "C"]));
    }

    #[test]
    fn test_operators_resolve_inside_new_subtree() {
        let merged = merge(
            &tree(json!({"route": {"rules+": [{"outbound": "direct"}]}})),
            Tree::new(),
        );
        assert_eq!(merged["route"], json!({"rules": [{"outbound": "direct"}]}));
    }

    #[test]
    fn test_keys_not_in_from_are_kept() {
        let merged = merge(
            &tree(json!({"new": 1})),
            tree(json!({"existing": "value", "another": true})),
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["existing"], json!("value"));
    }
}
