//! PapiClient trait for mocking
//!
//! Abstracts the PAPI client so the controller can be exercised against an
//! in-memory implementation. The concrete `PapiClient` implements this
//! trait; tests use `MockPapiClient`. All methods are `Send` for Tokio's
//! work-stealing runtime.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::PapiError;
use crate::hostnames::split_edge_hostname;
use crate::models::*;

/// Operations the operator needs from the Property Manager API.
#[async_trait::async_trait]
pub trait PapiClientTrait: Send + Sync {
    /// Base URL of the API endpoint.
    fn base_url(&self) -> &str;

    // Property lifecycle
    async fn create_property(&self, new: &NewProperty) -> Result<String, PapiError>;
    async fn get_property(&self, property_id: &str) -> Result<Property, PapiError>;
    async fn create_property_version(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        from_version: i64,
    ) -> Result<i64, PapiError>;
    async fn remove_property(&self, property_id: &str) -> Result<(), PapiError>;

    // Hostnames
    async fn get_hostnames(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        version: i64,
    ) -> Result<Vec<Hostname>, PapiError>;
    async fn set_hostnames(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        version: i64,
        hostnames: &[Hostname],
    ) -> Result<(), PapiError>;

    // Edge hostnames
    async fn list_edge_hostnames(
        &self,
        contract_id: &str,
        group_id: &str,
    ) -> Result<Vec<EdgeHostname>, PapiError>;
    async fn create_edge_hostname(
        &self,
        new: &NewEdgeHostname,
        product_id: &str,
        contract_id: &str,
        group_id: &str,
    ) -> Result<String, PapiError>;

    // Rule trees
    async fn get_rule_tree(
        &self,
        property_id: &str,
        version: i64,
        contract_id: &str,
        group_id: &str,
    ) -> Result<RuleTree, PapiError>;
    async fn update_rule_tree(
        &self,
        property_id: &str,
        version: i64,
        contract_id: &str,
        group_id: &str,
        rules: &serde_json::Value,
        etag: &str,
    ) -> Result<RuleTree, PapiError>;

    // Activations
    async fn create_activation(
        &self,
        property_id: &str,
        version: i64,
        new: &NewActivation,
        contract_id: &str,
        group_id: &str,
    ) -> Result<String, PapiError>;
    async fn get_activation(
        &self,
        property_id: &str,
        activation_id: &str,
    ) -> Result<Activation, PapiError>;
    async fn list_activations(&self, property_id: &str) -> Result<Vec<Activation>, PapiError>;

    /// Returns the network a version is published on, if any.
    async fn version_published_on(
        &self,
        property_id: &str,
        version: i64,
    ) -> Result<Option<String>, PapiError> {
        let property = self.get_property(property_id).await?;
        if property.staging_version == version {
            return Ok(Some("STAGING".to_string()));
        }
        if property.production_version == version {
            return Ok(Some("PRODUCTION".to_string()));
        }
        Ok(None)
    }

    /// Finds an in-flight (PENDING/ACTIVATING) activation for a network, if
    /// one exists.
    async fn pending_activation(
        &self,
        property_id: &str,
        network: &str,
    ) -> Result<Option<Activation>, PapiError> {
        let activations = self.list_activations(property_id).await?;
        Ok(activations
            .into_iter()
            .find(|a| a.network == network && activation_status::is_in_flight(&a.status)))
    }

    /// Ensures an edge hostname exists for every unique `cname_to` target.
    ///
    /// Existing edge hostnames are reused; missing ones are created from the
    /// template's secure-network and IP-version settings, with the domain
    /// split anchored on the template suffix.
    async fn ensure_edge_hostnames(
        &self,
        hostnames: &[Hostname],
        template: &EdgeHostnameTemplate,
        product_id: &str,
        contract_id: &str,
        group_id: &str,
    ) -> Result<(), PapiError> {
        if hostnames.is_empty() {
            return Ok(());
        }

        let existing = self.list_edge_hostnames(contract_id, group_id).await?;
        let existing_domains: BTreeSet<String> =
            existing.iter().map(EdgeHostname::domain).collect();

        let targets: BTreeSet<&str> = hostnames.iter().map(|h| h.cname_to.as_str()).collect();

        for target in targets {
            if existing_domains.contains(target) {
                debug!(domain = target, "edge hostname already exists");
                continue;
            }

            let (prefix, suffix) = split_edge_hostname(target, template)?;
            let secure = suffix.contains("edgekey")
                || suffix.contains("akamaized")
                || template.secure_network.as_deref().is_some_and(|s| !s.is_empty());
            let new = NewEdgeHostname {
                domain_prefix: prefix,
                domain_suffix: suffix,
                secure,
                secure_network: template.secure_network.clone(),
                ip_version_behavior: template
                    .ip_version_behavior
                    .clone()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "IPV4".to_string()),
            };

            let id = self
                .create_edge_hostname(&new, product_id, contract_id, group_id)
                .await?;
            info!(domain = target, edge_hostname_id = %id, "created edge hostname");
        }

        Ok(())
    }
}
