//! CDNProperty CRD
//!
//! Declares a property on the CDN: name, contract/group/product, hostnames,
//! an edge-hostname template, a rule tree, and an optional activation
//! request. Cluster-scoped; one resource per managed property.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rules::PropertyRules;

/// Finalizer guarding remote deletion. Present whenever the remote property
/// exists; removed only after the remote side is gone.
pub const FINALIZER_NAME: &str = "cdnops.io/finalizer";

/// Coarse lifecycle phases surfaced in `status.phase`.
pub mod phase {
    pub const CREATING: &str = "Creating";
    pub const READY: &str = "Ready";
    pub const UPDATING: &str = "Updating";
    pub const ACTIVATING: &str = "Activating";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";
}

/// Condition types used in `status.conditions`.
pub const CONDITION_TYPE_READY: &str = "Ready";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cdnops.io",
    version = "v1alpha1",
    kind = "CDNProperty",
    status = "CDNPropertyStatus",
    printcolumn = r#"{"name":"Property ID","type":"string","jsonPath":".status.propertyId"}"#,
    printcolumn = r#"{"name":"Latest","type":"integer","jsonPath":".status.latestVersion"}"#,
    printcolumn = r#"{"name":"Staging","type":"integer","jsonPath":".status.stagingVersion"}"#,
    printcolumn = r#"{"name":"Production","type":"integer","jsonPath":".status.productionVersion"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CDNPropertySpec {
    /// Name of the property on the CDN. Immutable after creation.
    pub property_name: String,

    /// Contract the property is billed under (e.g. "ctr_C-1ED34DY").
    pub contract_id: String,

    /// Group the property is created in (e.g. "grp_123456").
    pub group_id: String,

    /// Product the property is provisioned for (e.g. "prd_Fresca").
    pub product_id: String,

    /// Hostnames served by this property. Entry identity is `cnameFrom`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<Hostname>,

    /// Template used to auto-create edge hostnames referenced by
    /// `hostnames[].cnameTo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_hostname_template: Option<EdgeHostnameTemplate>,

    /// Desired rule tree. The root rule must be named "default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<PropertyRules>,

    /// Activation request. Absent means "do not activate".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationSpec>,
}

/// One hostname entry of a property version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hostname {
    /// The user-facing hostname that will be CNAMEd to the edge.
    pub cname_from: String,

    /// The edge hostname target.
    pub cname_to: String,

    /// Certificate provisioning mode (e.g. "CPS_MANAGED", "DEFAULT").
    /// Empty matches whatever the remote side reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_provisioning_type: Option<String>,
}

/// Template for edge hostnames created on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHostnameTemplate {
    /// Domain prefix, e.g. "www.example.com".
    pub domain_prefix: String,

    /// Domain suffix, e.g. "edgesuite.net" or "edgekey.net".
    pub domain_suffix: String,

    /// Secure network type (e.g. "ENHANCED_TLS").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_network: Option<String>,

    /// IP version behavior ("IPV4", "IPV6_COMPLIANCE"). Defaults to IPV4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version_behavior: Option<String>,
}

/// Network a property version can be activated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ActivationNetwork {
    #[serde(rename = "STAGING")]
    Staging,
    #[serde(rename = "PRODUCTION")]
    Production,
}

impl ActivationNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationNetwork::Staging => "STAGING",
            ActivationNetwork::Production => "PRODUCTION",
        }
    }
}

impl std::fmt::Display for ActivationNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests activation of the latest property version on one network.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivationSpec {
    /// Target network.
    pub network: ActivationNetwork,

    /// Email addresses notified on activation status changes.
    pub notify_emails: Vec<String>,

    /// Log note for the activation. Changing the note is the user-visible
    /// signal that gates re-activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Acknowledge all validation warnings in one go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledge_all_warnings: Option<bool>,

    /// Enable fast fallback (rollback within one hour).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_fast_fallback: Option<bool>,

    /// Enable fast metadata push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_push: Option<bool>,

    /// Ignore HTTP errors while pushing fast metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_http_errors: Option<bool>,
}

/// Observed state. Version fields use 0 for "unknown"; id and status strings
/// use "" for "none".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CDNPropertyStatus {
    /// Remote property identifier (e.g. "prp_123456"). Empty until created.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub property_id: String,

    /// Highest version known on the remote side.
    #[serde(default)]
    pub latest_version: i64,

    /// Version currently active on staging.
    #[serde(default)]
    pub staging_version: i64,

    /// Version currently active on production.
    #[serde(default)]
    pub production_version: i64,

    /// Identifier of the last staging activation started by the controller.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staging_activation_id: String,

    /// Identifier of the last production activation started by the controller.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub production_activation_id: String,

    /// Last observed staging activation status (PENDING, ACTIVATING, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staging_activation_status: String,

    /// Last observed production activation status.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub production_activation_status: String,

    /// Note sent with the last staging activation. Pre-image for the
    /// note-change gate.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staging_activation_note: String,

    /// Note sent with the last production activation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub production_activation_note: String,

    /// Current lifecycle phase.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,

    /// Typed conditions, keyed by `type`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PropertyCondition>,

    /// When the status last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CDNPropertyStatus {
    /// Activation bookkeeping for one network, as a view over the flat fields.
    pub fn activation_for(&self, network: ActivationNetwork) -> NetworkActivation<'_> {
        match network {
            ActivationNetwork::Staging => NetworkActivation {
                activation_id: &self.staging_activation_id,
                activation_status: &self.staging_activation_status,
                activation_note: &self.staging_activation_note,
                active_version: self.staging_version,
            },
            ActivationNetwork::Production => NetworkActivation {
                activation_id: &self.production_activation_id,
                activation_status: &self.production_activation_status,
                activation_note: &self.production_activation_note,
                active_version: self.production_version,
            },
        }
    }
}

/// Borrowed per-network activation view.
pub struct NetworkActivation<'a> {
    pub activation_id: &'a str,
    pub activation_status: &'a str,
    pub activation_note: &'a str,
    pub active_version: i64,
}

/// A single typed condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCondition {
    /// Condition type, e.g. "Ready".
    #[serde(rename = "type")]
    pub type_: String,

    /// "True", "False", or "Unknown".
    pub status: String,

    /// Machine-readable reason for the last transition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Advances only when status, reason, or message change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}
