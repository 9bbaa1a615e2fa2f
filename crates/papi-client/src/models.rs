//! PAPI models
//!
//! These mirror the Property Manager API response shapes the operator
//! consumes. Rule payloads stay opaque (`serde_json::Value`); the controller
//! owns their interpretation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activation/network literals and status sets used across the API.
pub mod activation_status {
    pub const PENDING: &str = "PENDING";
    pub const ACTIVATING: &str = "ACTIVATING";
    pub const ACTIVE: &str = "ACTIVE";
    pub const FAILED: &str = "FAILED";
    pub const DEACTIVATED: &str = "DEACTIVATED";
    pub const ABORTED: &str = "ABORTED";

    /// True for states that mean "a job is running right now".
    pub fn is_in_flight(status: &str) -> bool {
        status == PENDING || status == ACTIVATING
    }
}

/// A property as reported by the API, enriched with the latest version's
/// hostnames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_id: String,
    pub property_name: String,
    #[serde(default)]
    pub account_id: String,
    pub contract_id: String,
    pub group_id: String,
    #[serde(default)]
    pub product_id: String,
    pub latest_version: i64,
    #[serde(default)]
    pub staging_version: i64,
    #[serde(default)]
    pub production_version: i64,
    #[serde(default)]
    pub hostnames: Vec<Hostname>,
}

/// One hostname entry of a property version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostname {
    pub cname_from: String,
    pub cname_to: String,
    #[serde(default)]
    pub cert_provisioning_type: String,
}

/// Request payload for property creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub property_name: String,
    pub product_id: String,
    pub contract_id: String,
    pub group_id: String,
}

/// An edge hostname owned by the contract/group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHostname {
    #[serde(default)]
    pub edge_hostname_id: String,
    pub domain_prefix: String,
    pub domain_suffix: String,
    #[serde(default)]
    pub edge_hostname_domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub ip_version_behavior: String,
}

impl EdgeHostname {
    /// Full domain; falls back to prefix.suffix when the API omits the
    /// combined field.
    pub fn domain(&self) -> String {
        if self.edge_hostname_domain.is_empty() {
            format!("{}.{}", self.domain_prefix, self.domain_suffix)
        } else {
            self.edge_hostname_domain.clone()
        }
    }
}

/// Request payload for edge hostname creation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEdgeHostname {
    pub domain_prefix: String,
    pub domain_suffix: String,
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_network: Option<String>,
    pub ip_version_behavior: String,
}

/// Template used to derive edge hostnames for hostname targets.
#[derive(Debug, Clone, Default)]
pub struct EdgeHostnameTemplate {
    pub domain_prefix: String,
    pub domain_suffix: String,
    pub secure_network: Option<String>,
    pub ip_version_behavior: Option<String>,
}

/// A rule tree read or write result. `rules` is the raw tree; `etag` guards
/// the next write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTree {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub property_id: String,
    #[serde(default)]
    pub property_version: i64,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub rule_format: String,
    pub rules: Value,
    #[serde(default)]
    pub errors: Vec<RuleError>,
}

/// A validation error embedded in a rule tree response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleError {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, rename = "type")]
    pub error_type: String,
}

/// An activation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub activation_id: String,
    #[serde(default)]
    pub property_id: String,
    pub property_version: i64,
    pub network: String,
    pub status: String,
    #[serde(default)]
    pub submit_date: String,
    #[serde(default)]
    pub update_date: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub notify_emails: Vec<String>,
}

/// Request payload for starting an activation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivation {
    pub network: String,
    pub note: String,
    pub notify_emails: Vec<String>,
    pub acknowledge_all_warnings: bool,
    pub use_fast_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_push: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_http_errors: Option<bool>,
}
