//! Validation tests: root-name enforcement, required options, variable
//! hygiene, and recursive child checks.

use super::*;
use crds::PropertyRules;
use serde_json::json;

fn rules_from(value: serde_json::Value) -> PropertyRules {
    serde_json::from_value(value).unwrap()
}

#[test]
fn minimal_default_rule_is_valid() {
    let rules = rules_from(json!({"name": "default"}));
    assert!(validate(&rules).is_ok());
}

#[test]
fn root_must_be_named_default() {
    let rules = rules_from(json!({"name": "root"}));
    let err = validate(&rules).unwrap_err();
    assert!(err.contains("must be 'default'"), "unexpected error: {err}");

    let rules = rules_from(json!({"name": ""}));
    assert!(validate(&rules).is_err());
}

#[test]
fn origin_behavior_requires_options() {
    let rules = rules_from(json!({
        "name": "default",
        "behaviors": [{"name": "origin"}],
    }));
    let err = validate(&rules).unwrap_err();
    assert!(err.contains("origin behavior requires options"), "unexpected error: {err}");

    let rules = rules_from(json!({
        "name": "default",
        "behaviors": [{"name": "origin", "options": {"hostname": "o.example.com"}}],
    }));
    assert!(validate(&rules).is_ok());
}

#[test]
fn caching_behavior_requires_options() {
    let rules = rules_from(json!({
        "name": "default",
        "behaviors": [{"name": "caching", "options": null}],
    }));
    assert!(validate(&rules).is_err());
}

#[test]
fn unknown_behaviors_are_forwarded_without_options() {
    let rules = rules_from(json!({
        "name": "default",
        "behaviors": [{"name": "http2"}, {"name": "compress"}],
    }));
    assert!(validate(&rules).is_ok());
}

#[test]
fn behavior_name_is_required() {
    let rules = rules_from(json!({
        "name": "default",
        "behaviors": [{"name": ""}],
    }));
    let err = validate(&rules).unwrap_err();
    assert!(err.contains("behavior name is required"));
}

#[test]
fn curated_criteria_require_options() {
    for name in ["hostname", "path", "requestMethod"] {
        let rules = rules_from(json!({
            "name": "default",
            "criteria": [{"name": name}],
        }));
        assert!(validate(&rules).is_err(), "{name} should require options");
    }

    let rules = rules_from(json!({
        "name": "default",
        "criteria": [{"name": "hostname", "options": {"values": ["example.com"]}}],
    }));
    assert!(validate(&rules).is_ok());
}

#[test]
fn variable_names_must_be_uppercase_without_whitespace() {
    let rules = rules_from(json!({
        "name": "default",
        "variables": [{"name": "pmuser_origin", "value": "x"}],
    }));
    assert!(validate(&rules).unwrap_err().contains("uppercase"));

    let rules = rules_from(json!({
        "name": "default",
        "variables": [{"name": "PMUSER ORIGIN", "value": "x"}],
    }));
    assert!(validate(&rules).unwrap_err().contains("whitespace"));

    let rules = rules_from(json!({
        "name": "default",
        "variables": [{"name": "PMUSER_ORIGIN", "value": "x", "hidden": true}],
    }));
    assert!(validate(&rules).is_ok());
}

#[test]
fn duplicate_variable_names_are_rejected() {
    let rules = rules_from(json!({
        "name": "default",
        "variables": [
            {"name": "PMUSER_A", "value": "1"},
            {"name": "PMUSER_A", "value": "2"},
        ],
    }));
    assert!(validate(&rules).unwrap_err().contains("duplicate"));
}

#[test]
fn children_are_validated_recursively() {
    let rules = rules_from(json!({
        "name": "default",
        "children": [
            {
                "name": "static content",
                "behaviors": [{"name": "caching"}],
            }
        ],
    }));
    let err = validate(&rules).unwrap_err();
    assert!(err.contains("children[0]"), "unexpected error: {err}");
    assert!(err.contains("caching behavior requires options"));
}

#[test]
fn children_need_not_be_named_default() {
    let rules = rules_from(json!({
        "name": "default",
        "children": [
            {
                "name": "static content",
                "behaviors": [{"name": "caching", "options": {"behavior": "NO_STORE"}}],
            }
        ],
    }));
    assert!(validate(&rules).is_ok());
}

#[test]
fn unparseable_child_is_rejected() {
    let rules = rules_from(json!({
        "name": "default",
        "children": [{"name": 42}],
    }));
    let err = validate(&rules).unwrap_err();
    assert!(err.contains("failed to parse child rule"));
}
