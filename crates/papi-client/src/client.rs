//! PAPI HTTP client
//!
//! Implements `PapiClientTrait` over the Property Manager REST endpoints
//! (`/papi/v1/...`) with EdgeGrid-signed requests.

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::auth::EdgeGridCredentials;
use crate::error::PapiError;
use crate::links;
use crate::models::*;
use crate::papi_trait::PapiClientTrait;

/// Rule format pinned at property creation.
const RULE_FORMAT: &str = "v2023-01-05";

/// PAPI client
pub struct PapiClient {
    http: Client,
    base_url: String,
    credentials: EdgeGridCredentials,
}

impl PapiClient {
    /// Creates a client from validated EdgeGrid credentials.
    pub fn new(credentials: EdgeGridCredentials) -> Result<Self, PapiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(PapiError::Http)?;
        Ok(Self {
            http,
            base_url: credentials.base_url(),
            credentials,
        })
    }

    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&Value>,
    ) -> Result<(u16, String), PapiError> {
        let url = Url::parse(&format!("{}{}", self.base_url, path_and_query))
            .map_err(|e| PapiError::InvalidRequest(format!("invalid URL {path_and_query}: {e}")))?;

        let body_bytes = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        let auth = self.credentials.sign(method.as_str(), &url, &body_bytes);

        debug!(method = %method, url = %url, "PAPI request");

        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", auth)
            .header("PAPI-Use-Prefixes", "true")
            .header("Accept", "application/json");
        if body.is_some() {
            request = request
                .header("Content-Type", "application/json")
                .body(body_bytes);
        }

        let response = request.send().await.map_err(PapiError::Http)?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            code if status.is_success() => Ok((code, text)),
            401 | 403 => Err(PapiError::Authentication(format!("{status}: {text}"))),
            404 => Err(PapiError::NotFound(format!("{path_and_query}: {text}"))),
            409 | 412 => Err(PapiError::Conflict(format!("{status}: {text}"))),
            code => Err(PapiError::Api {
                status: code,
                message: text,
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, PapiError> {
        let (_, text) = self.send(Method::GET, path_and_query, None).await?;
        parse_body(&text)
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, PapiError> {
    serde_json::from_str(text).map_err(|e| PapiError::Api {
        status: 200,
        message: format!(
            "error decoding response body: {e} - response (first 500 chars): {}",
            text.chars().take(500).collect::<String>()
        ),
    })
}

// Wire shapes for list-style responses.

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct PropertiesResponse {
    properties: ItemsEnvelope<WireProperty>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProperty {
    property_id: String,
    property_name: String,
    #[serde(default)]
    account_id: String,
    contract_id: String,
    group_id: String,
    #[serde(default)]
    product_id: String,
    latest_version: i64,
    staging_version: Option<i64>,
    production_version: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyLinkResponse {
    property_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionLinkResponse {
    version_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivationLinkResponse {
    activation_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeHostnameLinkResponse {
    edge_hostname_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostnamesResponse {
    hostnames: ItemsEnvelope<Hostname>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeHostnamesResponse {
    edge_hostnames: ItemsEnvelope<EdgeHostname>,
}

#[derive(Deserialize)]
struct ActivationsResponse {
    activations: ItemsEnvelope<Activation>,
}

#[async_trait::async_trait]
impl PapiClientTrait for PapiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_property(&self, new: &NewProperty) -> Result<String, PapiError> {
        let path = format!(
            "/papi/v1/properties?contractId={}&groupId={}",
            new.contract_id, new.group_id
        );
        let body = serde_json::json!({
            "propertyName": new.property_name,
            "productId": new.product_id,
            "ruleFormat": RULE_FORMAT,
        });
        let (_, text) = self.send(Method::POST, &path, Some(&body)).await?;
        let response: PropertyLinkResponse = parse_body(&text)?;
        links::property_id_from_link(&response.property_link)
    }

    async fn get_property(&self, property_id: &str) -> Result<Property, PapiError> {
        let response: PropertiesResponse = self
            .get_json(&format!("/papi/v1/properties/{property_id}"))
            .await?;
        let wire = response
            .properties
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PapiError::NotFound(format!("property {property_id} not found")))?;

        let mut property = Property {
            property_id: wire.property_id,
            property_name: wire.property_name,
            account_id: wire.account_id,
            contract_id: wire.contract_id,
            group_id: wire.group_id,
            product_id: wire.product_id,
            latest_version: wire.latest_version,
            staging_version: wire.staging_version.unwrap_or(0),
            production_version: wire.production_version.unwrap_or(0),
            hostnames: Vec::new(),
        };

        // Hostname fetch is best-effort: a fresh property may not have any
        // configured yet.
        if property.latest_version > 0 {
            match self
                .get_hostnames(
                    &property.property_id,
                    &property.contract_id,
                    &property.group_id,
                    property.latest_version,
                )
                .await
            {
                Ok(hostnames) => property.hostnames = hostnames,
                Err(e) => {
                    warn!(property_id = %property.property_id, error = %e,
                        "failed to fetch hostnames for latest version");
                }
            }
        }

        Ok(property)
    }

    async fn create_property_version(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        from_version: i64,
    ) -> Result<i64, PapiError> {
        let path = format!(
            "/papi/v1/properties/{property_id}/versions?contractId={contract_id}&groupId={group_id}"
        );
        let body = serde_json::json!({ "createFromVersion": from_version });
        let (_, text) = self.send(Method::POST, &path, Some(&body)).await?;
        let response: VersionLinkResponse = parse_body(&text)?;
        links::version_from_link(&response.version_link)
    }

    async fn remove_property(&self, property_id: &str) -> Result<(), PapiError> {
        self.send(
            Method::DELETE,
            &format!("/papi/v1/properties/{property_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get_hostnames(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        version: i64,
    ) -> Result<Vec<Hostname>, PapiError> {
        let response: HostnamesResponse = self
            .get_json(&format!(
                "/papi/v1/properties/{property_id}/versions/{version}/hostnames?contractId={contract_id}&groupId={group_id}"
            ))
            .await?;
        Ok(response.hostnames.items)
    }

    async fn set_hostnames(
        &self,
        property_id: &str,
        contract_id: &str,
        group_id: &str,
        version: i64,
        hostnames: &[Hostname],
    ) -> Result<(), PapiError> {
        let path = format!(
            "/papi/v1/properties/{property_id}/versions/{version}/hostnames?contractId={contract_id}&groupId={group_id}"
        );
        let entries: Vec<Value> = hostnames
            .iter()
            .map(|h| {
                serde_json::json!({
                    "cnameType": "EDGE_HOSTNAME",
                    "cnameFrom": h.cname_from,
                    "cnameTo": h.cname_to,
                    "certProvisioningType": h.cert_provisioning_type,
                })
            })
            .collect();
        let body = serde_json::json!(entries);
        self.send(Method::PUT, &path, Some(&body)).await?;
        Ok(())
    }

    async fn list_edge_hostnames(
        &self,
        contract_id: &str,
        group_id: &str,
    ) -> Result<Vec<EdgeHostname>, PapiError> {
        let response: EdgeHostnamesResponse = self
            .get_json(&format!(
                "/papi/v1/edgehostnames?contractId={contract_id}&groupId={group_id}"
            ))
            .await?;
        Ok(response.edge_hostnames.items)
    }

    async fn create_edge_hostname(
        &self,
        new: &NewEdgeHostname,
        product_id: &str,
        contract_id: &str,
        group_id: &str,
    ) -> Result<String, PapiError> {
        let path =
            format!("/papi/v1/edgehostnames?contractId={contract_id}&groupId={group_id}");
        let mut body = serde_json::to_value(new)?;
        body["productId"] = Value::String(product_id.to_string());
        let (_, text) = self.send(Method::POST, &path, Some(&body)).await?;
        let response: EdgeHostnameLinkResponse = parse_body(&text)?;
        links::edge_hostname_id_from_link(&response.edge_hostname_link)
    }

    async fn get_rule_tree(
        &self,
        property_id: &str,
        version: i64,
        contract_id: &str,
        group_id: &str,
    ) -> Result<RuleTree, PapiError> {
        // Reads skip server-side validation: this path is polled every
        // reconcile and validation only matters on write.
        self.get_json(&format!(
            "/papi/v1/properties/{property_id}/versions/{version}/rules?contractId={contract_id}&groupId={group_id}&validateRules=false"
        ))
        .await
    }

    async fn update_rule_tree(
        &self,
        property_id: &str,
        version: i64,
        contract_id: &str,
        group_id: &str,
        rules: &Value,
        etag: &str,
    ) -> Result<RuleTree, PapiError> {
        let validated_path = format!(
            "/papi/v1/properties/{property_id}/versions/{version}/rules?contractId={contract_id}&groupId={group_id}&validateRules=true&validateMode=full"
        );
        let body = serde_json::json!({ "rules": rules, "etag": etag });

        let result = self.send(Method::PUT, &validated_path, Some(&body)).await;
        let text = match result {
            Ok((_, text)) => text,
            // Older rule formats reject validateMode=full; retry exactly once
            // with validation off.
            Err(PapiError::Api { status, message })
                if message.contains("not a feature") || message.contains("validate") =>
            {
                warn!(
                    property_id,
                    version, status, "full validation rejected, retrying without validation"
                );
                let fallback_path = format!(
                    "/papi/v1/properties/{property_id}/versions/{version}/rules?contractId={contract_id}&groupId={group_id}&validateRules=false"
                );
                let (_, text) = self.send(Method::PUT, &fallback_path, Some(&body)).await?;
                text
            }
            Err(e) => return Err(e),
        };

        let tree: RuleTree = parse_body(&text)?;
        if !tree.errors.is_empty() {
            let details: Vec<String> = tree
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.title, e.detail))
                .collect();
            return Err(PapiError::InvalidRequest(format!(
                "rule validation errors: {}",
                details.join("; ")
            )));
        }
        Ok(tree)
    }

    async fn create_activation(
        &self,
        property_id: &str,
        version: i64,
        new: &NewActivation,
        contract_id: &str,
        group_id: &str,
    ) -> Result<String, PapiError> {
        let path = format!(
            "/papi/v1/properties/{property_id}/activations?contractId={contract_id}&groupId={group_id}"
        );
        let mut body = serde_json::to_value(new)?;
        body["propertyVersion"] = Value::from(version);
        let (_, text) = self.send(Method::POST, &path, Some(&body)).await?;
        let response: ActivationLinkResponse = parse_body(&text)?;
        links::activation_id_from_link(&response.activation_link)
    }

    async fn get_activation(
        &self,
        property_id: &str,
        activation_id: &str,
    ) -> Result<Activation, PapiError> {
        let response: ActivationsResponse = self
            .get_json(&format!(
                "/papi/v1/properties/{property_id}/activations/{activation_id}"
            ))
            .await?;
        response
            .activations
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PapiError::NotFound(format!("activation {activation_id} not found")))
    }

    async fn list_activations(&self, property_id: &str) -> Result<Vec<Activation>, PapiError> {
        let response: ActivationsResponse = self
            .get_json(&format!("/papi/v1/properties/{property_id}/activations"))
            .await?;
        Ok(response.activations.items)
    }
}
