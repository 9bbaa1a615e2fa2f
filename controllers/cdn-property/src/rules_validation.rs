//! Rule tree validation, run before any write.
//!
//! Validation is pure: a failing tree fails on every requeue until the user
//! corrects the spec, so failures surface as a condition instead of an error
//! requeue. The curated required-options sets cover the behaviors and
//! criteria the API always rejects without options; unknown names are
//! forwarded verbatim and left to server-side validation.

#[cfg(test)]
#[path = "rules_validation_test.rs"]
mod tests;

use std::collections::HashSet;

use crds::{PropertyRules, RuleBehavior, RuleCriteria, RuleVariable};
use serde_json::Value;

const BEHAVIORS_REQUIRING_OPTIONS: &[&str] = &["origin", "caching"];
const CRITERIA_REQUIRING_OPTIONS: &[&str] = &["hostname", "path", "requestMethod"];

/// Validates a desired rule tree. The root rule must be named "default";
/// children are parsed out of their opaque carriers and revalidated.
pub fn validate(rules: &PropertyRules) -> Result<(), String> {
    if rules.name.is_empty() {
        return Err("top-level rule must have a name (typically 'default')".to_string());
    }
    if rules.name != "default" {
        return Err(format!(
            "top-level rule name must be 'default', got '{}'",
            rules.name
        ));
    }
    validate_node(rules, "rules")
}

fn validate_node(rules: &PropertyRules, path: &str) -> Result<(), String> {
    for (i, behavior) in rules.behaviors.iter().enumerate() {
        validate_behavior(behavior, &format!("{path}.behaviors[{i}]"))?;
    }
    for (i, criterion) in rules.criteria.iter().enumerate() {
        validate_criterion(criterion, &format!("{path}.criteria[{i}]"))?;
    }

    let mut seen = HashSet::new();
    for (i, variable) in rules.variables.iter().enumerate() {
        validate_variable(variable, &format!("{path}.variables[{i}]"))?;
        if !seen.insert(variable.name.as_str()) {
            return Err(format!(
                "{path}.variables[{i}]: duplicate variable name '{}'",
                variable.name
            ));
        }
    }

    for (i, child) in rules.children.iter().enumerate() {
        let child_path = format!("{path}.children[{i}]");
        let child: PropertyRules = serde_json::from_value(child.clone())
            .map_err(|e| format!("{child_path}: failed to parse child rule: {e}"))?;
        if child.name.is_empty() {
            return Err(format!("{child_path}: rule name is required"));
        }
        validate_node(&child, &child_path)?;
    }

    Ok(())
}

fn validate_behavior(behavior: &RuleBehavior, path: &str) -> Result<(), String> {
    if behavior.name.is_empty() {
        return Err(format!("{path}: behavior name is required"));
    }
    if BEHAVIORS_REQUIRING_OPTIONS.contains(&behavior.name.as_str())
        && !has_options(&behavior.options)
    {
        return Err(format!(
            "{path}: {} behavior requires options",
            behavior.name
        ));
    }
    Ok(())
}

fn validate_criterion(criterion: &RuleCriteria, path: &str) -> Result<(), String> {
    if criterion.name.is_empty() {
        return Err(format!("{path}: criteria name is required"));
    }
    if CRITERIA_REQUIRING_OPTIONS.contains(&criterion.name.as_str())
        && !has_options(&criterion.options)
    {
        return Err(format!(
            "{path}: {} criteria requires options",
            criterion.name
        ));
    }
    Ok(())
}

fn validate_variable(variable: &RuleVariable, path: &str) -> Result<(), String> {
    if variable.name.is_empty() {
        return Err(format!("{path}: variable name is required"));
    }
    if variable.name != variable.name.to_uppercase() {
        return Err(format!(
            "{path}: variable name '{}' must be uppercase",
            variable.name
        ));
    }
    if variable.name.chars().any(char::is_whitespace) {
        return Err(format!(
            "{path}: variable name '{}' must not contain whitespace",
            variable.name
        ));
    }
    Ok(())
}

fn has_options(options: &Option<Value>) -> bool {
    !matches!(options, None | Some(Value::Null))
}
