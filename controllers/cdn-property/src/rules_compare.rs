//! Rule tree normalisation and comparison.
//!
//! The API enriches trees on write: it stamps uuids and timestamps onto
//! every node and injects defaults like `criteriaMustSatisfy: "all"`.
//! Comparing raw trees therefore diffs forever; comparing too loosely lets
//! the remote drift. Both sides are normalised identically and the canonical
//! JSON encodings are byte-compared.
//!
//! Normalisation:
//! 1. Strip server-owned fields from every node, behavior, and criterion.
//! 2. Default `criteriaMustSatisfy` to "all" when absent or empty.
//! 3. Treat null, empty object, and absent `options`/`customOverride` alike.
//! 4. Drop empty strings, empty arrays, and empty objects everywhere.
//! 5. Recurse into children (carried as opaque JSON).
//!
//! `serde_json` maps are ordered, so serialization of the normalised tree is
//! already canonical.

#[cfg(test)]
#[path = "rules_compare_test.rs"]
mod tests;

use serde_json::{Map, Value};

/// Fields stamped by the server; never meaningful for comparison.
const SERVER_FIELDS: &[&str] = &[
    "uuid",
    "templateUuid",
    "lastModified",
    "created",
    "etag",
    "ruleFormat",
];

/// Returns true when the desired tree differs from the current one after
/// normalisation, i.e. a write is required.
pub fn rules_need_update(desired: &Value, current: &Value) -> bool {
    !rules_equal(desired, current)
}

/// Structural equality under normalisation.
pub fn rules_equal(a: &Value, b: &Value) -> bool {
    canonical_json(a) == canonical_json(b)
}

/// Canonical encoding of a normalised tree; the comparison key.
pub fn canonical_json(tree: &Value) -> String {
    normalize_tree(tree).to_string()
}

/// Normalises a rule tree for comparison. Idempotent.
pub fn normalize_tree(tree: &Value) -> Value {
    let mut tree = tree.clone();
    if let Value::Object(node) = &mut tree {
        clean_rule_node(node);
    }
    prune_empty(&mut tree);
    tree
}

/// Structural pass: server fields and the `criteriaMustSatisfy` default,
/// applied to this node and recursively to its children.
fn clean_rule_node(node: &mut Map<String, Value>) {
    for field in SERVER_FIELDS {
        node.remove(*field);
    }

    let needs_default = match node.get("criteriaMustSatisfy") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if needs_default {
        node.insert("criteriaMustSatisfy".into(), Value::String("all".into()));
    }

    for key in ["behaviors", "criteria"] {
        if let Some(Value::Array(entries)) = node.get_mut(key) {
            for entry in entries {
                if let Value::Object(entry) = entry {
                    for field in SERVER_FIELDS {
                        entry.remove(*field);
                    }
                    if let Some(Value::Object(options)) = entry.get_mut("options") {
                        for field in SERVER_FIELDS {
                            options.remove(*field);
                        }
                    }
                }
            }
        }
    }

    if let Some(Value::Array(children)) = node.get_mut("children") {
        for child in children {
            if let Value::Object(child) = child {
                clean_rule_node(child);
            }
        }
    }
}

/// Value pass: null, "", {}, and [] are all equivalent to "absent" and are
/// removed from objects at every depth.
fn prune_empty(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for entry in map.values_mut() {
                prune_empty(entry);
            }
            map.retain(|_, v| !is_empty(v));
        }
        Value::Array(items) => {
            for item in items {
                prune_empty(item);
            }
        }
        _ => {}
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}
