//! Rule tree types.
//!
//! A property version's behavior is a recursive tree of rules. The cluster
//! schema cannot express unbounded recursion, so `children` is carried as
//! opaque JSON and reparsed into `PropertyRules` where the controller needs
//! to descend. Server-stamped decorations (`uuid`, timestamps) are accepted
//! on input and ignored on comparison.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of the rule tree. The root node must be named "default".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRules {
    /// Rule name.
    pub name: String,

    /// "all" or "any". Absent is equivalent to "all".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_must_satisfy: Option<String>,

    /// Match criteria for this rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<RuleCriteria>,

    /// Behaviors applied when the criteria match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<RuleBehavior>,

    /// Rule variables. Names are unique per node, uppercase, no whitespace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<RuleVariable>,

    /// Rule-level options, opaque to the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    /// Custom override reference, opaque to the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_override: Option<Value>,

    /// Child rules as raw JSON; each element parses back into
    /// `PropertyRules`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Value>,

    /// Server-stamped identifier. Never sent, ignored on compare.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// A behavior entry (e.g. "origin", "caching").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleBehavior {
    /// Behavior type.
    pub name: String,

    /// Behavior configuration, forwarded verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    /// Server-stamped identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// A criterion entry (e.g. "hostname", "path").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleCriteria {
    /// Criterion type.
    pub name: String,

    /// Criterion configuration, forwarded verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    /// Server-stamped identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// A rule variable declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleVariable {
    /// Variable name (uppercase, no whitespace, unique per node).
    pub name: String,

    /// Initial value.
    #[serde(default)]
    pub value: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Hidden from the UI.
    #[serde(default)]
    pub hidden: bool,

    /// Redacted in logs.
    #[serde(default)]
    pub sensitive: bool,
}
