//! Mock PAPI client for unit testing
//!
//! An in-memory implementation of `PapiClientTrait` that models the parts of
//! the remote behavior the reconciler depends on: version forking copies the
//! source version's rule tree and hostnames, rule writes are etag-guarded,
//! stored trees get server decorations stamped onto them (uuids, the
//! `criteriaMustSatisfy` default), and activation polls step
//! PENDING → ACTIVATING → ACTIVE, publishing the version on completion.
//!
//! Every trait call is appended to a call log so tests can assert exact call
//! sequences ("the second reconcile made no mutating calls").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::PapiError;
use crate::models::*;
use crate::papi_trait::PapiClientTrait;

#[derive(Default)]
struct MockState {
    properties: HashMap<String, Property>,
    // Keyed by (property_id, version)
    rule_trees: HashMap<(String, i64), Value>,
    etags: HashMap<(String, i64), String>,
    hostnames: HashMap<(String, i64), Vec<Hostname>>,
    edge_hostnames: Vec<EdgeHostname>,
    activations: HashMap<String, Activation>,
    activation_order: Vec<String>,
    calls: Vec<String>,
    next_id: u64,
    auto_advance: bool,
}

/// Mock PAPI client for testing
#[derive(Clone)]
pub struct MockPapiClient {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockPapiClient {
    /// Creates a mock whose activation polls auto-advance toward ACTIVE.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::new(Mutex::new(MockState {
                auto_advance: true,
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Disables activation auto-advance; polls then return the stored status
    /// until `set_activation_status` is called.
    pub fn hold_activations(&self) {
        self.state.lock().unwrap().auto_advance = false;
    }

    /// Registers a property with an initial (empty) version 1 rule tree.
    pub fn add_property(&self, property: Property) {
        let mut state = self.state.lock().unwrap();
        let id = property.property_id.clone();
        for version in 1..=property.latest_version.max(1) {
            state
                .rule_trees
                .entry((id.clone(), version))
                .or_insert_with(default_tree);
            let etag = format!("etag-{id}-{version}");
            state.etags.entry((id.clone(), version)).or_insert(etag);
        }
        state.properties.insert(id, property);
    }

    /// Replaces the stored rule tree for one version (test setup).
    pub fn set_rule_tree(&self, property_id: &str, version: i64, rules: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .rule_trees
            .insert((property_id.to_string(), version), rules);
        state
            .etags
            .entry((property_id.to_string(), version))
            .or_insert_with(|| format!("etag-{property_id}-{version}"));
    }

    /// Marks a version as published on a network.
    pub fn publish(&self, property_id: &str, network: &str, version: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(property) = state.properties.get_mut(property_id) {
            match network {
                "STAGING" => property.staging_version = version,
                _ => property.production_version = version,
            }
        }
    }

    /// Overrides an activation's status (e.g. to simulate FAILED).
    pub fn set_activation_status(&self, activation_id: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(activation) = state.activations.get_mut(activation_id) {
            activation.status = status.to_string();
        }
    }

    /// Registers an existing edge hostname (test setup).
    pub fn add_edge_hostname(&self, edge_hostname: EdgeHostname) {
        self.state.lock().unwrap().edge_hostnames.push(edge_hostname);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many recorded calls start with `prefix`.
    pub fn calls_named(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Clears the call log without touching state.
    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn take_id(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

fn default_tree() -> Value {
    serde_json::json!({
        "name": "default",
        "options": {},
        "criteria": [],
        "behaviors": [],
        "children": [],
    })
}

/// Stamps server decorations onto a stored tree the way the real API does:
/// uuids on every node, behavior, and criterion, plus the
/// `criteriaMustSatisfy` default.
fn decorate(node: &mut Value, counter: &mut u64) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    *counter += 1;
    obj.insert("uuid".into(), Value::String(format!("auto-{counter}")));
    if !obj.contains_key("criteriaMustSatisfy") {
        obj.insert("criteriaMustSatisfy".into(), Value::String("all".into()));
    }
    for key in ["behaviors", "criteria"] {
        if let Some(entries) = obj.get_mut(key).and_then(Value::as_array_mut) {
            for entry in entries {
                if let Some(entry) = entry.as_object_mut() {
                    *counter += 1;
                    entry.insert("uuid".into(), Value::String(format!("auto-{counter}")));
                }
            }
        }
    }
    if let Some(children) = obj.get_mut("children").and_then(Value::as_array_mut) {
        for child in children {
            decorate(child, counter);
        }
    }
}

#[async_trait::async_trait]
impl PapiClientTrait for MockPapiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_property(&self, new: &NewProperty) -> Result<String, PapiError> {
        let id = format!("prp_{}", self.take_id());
        self.record(format!("create_property({})", new.property_name));

        let mut state = self.state.lock().unwrap();
        state.properties.insert(
            id.clone(),
            Property {
                property_id: id.clone(),
                property_name: new.property_name.clone(),
                account_id: "act_mock".into(),
                contract_id: new.contract_id.clone(),
                group_id: new.group_id.clone(),
                product_id: new.product_id.clone(),
                latest_version: 1,
                staging_version: 0,
                production_version: 0,
                hostnames: Vec::new(),
            },
        );
        state.rule_trees.insert((id.clone(), 1), default_tree());
        state.etags.insert((id.clone(), 1), format!("etag-{id}-1"));
        Ok(id)
    }

    async fn get_property(&self, property_id: &str) -> Result<Property, PapiError> {
        self.record(format!("get_property({property_id})"));
        let state = self.state.lock().unwrap();
        let mut property = state
            .properties
            .get(property_id)
            .cloned()
            .ok_or_else(|| PapiError::NotFound(format!("property {property_id} not found")))?;
        property.hostnames = state
            .hostnames
            .get(&(property_id.to_string(), property.latest_version))
            .cloned()
            .unwrap_or_default();
        Ok(property)
    }

    async fn create_property_version(
        &self,
        property_id: &str,
        _contract_id: &str,
        _group_id: &str,
        from_version: i64,
    ) -> Result<i64, PapiError> {
        self.record(format!(
            "create_property_version({property_id},{from_version})"
        ));
        let mut state = self.state.lock().unwrap();
        let latest = state
            .properties
            .get(property_id)
            .map(|p| p.latest_version)
            .ok_or_else(|| PapiError::NotFound(format!("property {property_id} not found")))?;
        let new_version = latest + 1;

        let source_rules = state
            .rule_trees
            .get(&(property_id.to_string(), from_version))
            .cloned()
            .unwrap_or_else(default_tree);
        let source_etag = state
            .etags
            .get(&(property_id.to_string(), from_version))
            .cloned()
            .unwrap_or_else(|| format!("etag-{property_id}-{from_version}"));
        let source_hostnames = state
            .hostnames
            .get(&(property_id.to_string(), from_version))
            .cloned()
            .unwrap_or_default();

        state
            .rule_trees
            .insert((property_id.to_string(), new_version), source_rules);
        state
            .etags
            .insert((property_id.to_string(), new_version), source_etag);
        state
            .hostnames
            .insert((property_id.to_string(), new_version), source_hostnames);
        if let Some(property) = state.properties.get_mut(property_id) {
            property.latest_version = new_version;
        }
        Ok(new_version)
    }

    async fn remove_property(&self, property_id: &str) -> Result<(), PapiError> {
        self.record(format!("remove_property({property_id})"));
        let mut state = self.state.lock().unwrap();
        if state.properties.remove(property_id).is_none() {
            return Err(PapiError::NotFound(format!(
                "property {property_id} not found"
            )));
        }
        state.rule_trees.retain(|(id, _), _| id != property_id);
        state.etags.retain(|(id, _), _| id != property_id);
        state.hostnames.retain(|(id, _), _| id != property_id);
        Ok(())
    }

    async fn get_hostnames(
        &self,
        property_id: &str,
        _contract_id: &str,
        _group_id: &str,
        version: i64,
    ) -> Result<Vec<Hostname>, PapiError> {
        self.record(format!("get_hostnames({property_id},{version})"));
        let state = self.state.lock().unwrap();
        if !state.properties.contains_key(property_id) {
            return Err(PapiError::NotFound(format!(
                "property {property_id} not found"
            )));
        }
        Ok(state
            .hostnames
            .get(&(property_id.to_string(), version))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_hostnames(
        &self,
        property_id: &str,
        _contract_id: &str,
        _group_id: &str,
        version: i64,
        hostnames: &[Hostname],
    ) -> Result<(), PapiError> {
        self.record(format!("set_hostnames({property_id},{version})"));
        let mut state = self.state.lock().unwrap();
        if !state.properties.contains_key(property_id) {
            return Err(PapiError::NotFound(format!(
                "property {property_id} not found"
            )));
        }
        state
            .hostnames
            .insert((property_id.to_string(), version), hostnames.to_vec());
        Ok(())
    }

    async fn list_edge_hostnames(
        &self,
        _contract_id: &str,
        _group_id: &str,
    ) -> Result<Vec<EdgeHostname>, PapiError> {
        self.record("list_edge_hostnames".into());
        Ok(self.state.lock().unwrap().edge_hostnames.clone())
    }

    async fn create_edge_hostname(
        &self,
        new: &NewEdgeHostname,
        _product_id: &str,
        _contract_id: &str,
        _group_id: &str,
    ) -> Result<String, PapiError> {
        let id = format!("ehn_{}", self.take_id());
        self.record(format!(
            "create_edge_hostname({}.{})",
            new.domain_prefix, new.domain_suffix
        ));
        let mut state = self.state.lock().unwrap();
        state.edge_hostnames.push(EdgeHostname {
            edge_hostname_id: id.clone(),
            domain_prefix: new.domain_prefix.clone(),
            domain_suffix: new.domain_suffix.clone(),
            edge_hostname_domain: format!("{}.{}", new.domain_prefix, new.domain_suffix),
            secure: new.secure,
            ip_version_behavior: new.ip_version_behavior.clone(),
        });
        Ok(id)
    }

    async fn get_rule_tree(
        &self,
        property_id: &str,
        version: i64,
        contract_id: &str,
        group_id: &str,
    ) -> Result<RuleTree, PapiError> {
        self.record(format!("get_rule_tree({property_id},{version})"));
        let state = self.state.lock().unwrap();
        let rules = state
            .rule_trees
            .get(&(property_id.to_string(), version))
            .cloned()
            .ok_or_else(|| {
                PapiError::NotFound(format!("rules for {property_id} v{version} not found"))
            })?;
        let etag = state
            .etags
            .get(&(property_id.to_string(), version))
            .cloned()
            .unwrap_or_default();
        Ok(RuleTree {
            contract_id: contract_id.into(),
            group_id: group_id.into(),
            property_id: property_id.into(),
            property_version: version,
            etag,
            rule_format: "v2023-01-05".into(),
            rules,
            ..Default::default()
        })
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
        self.record(format!("update_rule_tree({property_id},{version})"));
        let mut state = self.state.lock().unwrap();
        let key = (property_id.to_string(), version);
        let current_etag = state
            .etags
            .get(&key)
            .cloned()
            .ok_or_else(|| PapiError::NotFound(format!("{property_id} v{version} not found")))?;
        if !etag.is_empty() && etag != current_etag {
            return Err(PapiError::Conflict(format!(
                "etag mismatch for {property_id} v{version}"
            )));
        }

        let mut stored = rules.clone();
        let mut counter = 0;
        decorate(&mut stored, &mut counter);
        state.rule_trees.insert(key.clone(), stored.clone());
        let new_etag = format!("{current_etag}+1");
        state.etags.insert(key, new_etag.clone());

        Ok(RuleTree {
            contract_id: contract_id.into(),
            group_id: group_id.into(),
            property_id: property_id.into(),
            property_version: version,
            etag: new_etag,
            rule_format: "v2023-01-05".into(),
            rules: stored,
            ..Default::default()
        })
    }

    async fn create_activation(
        &self,
        property_id: &str,
        version: i64,
        new: &NewActivation,
        _contract_id: &str,
        _group_id: &str,
    ) -> Result<String, PapiError> {
        let id = format!("atv_{}", self.take_id());
        self.record(format!(
            "create_activation({property_id},{version},{})",
            new.network
        ));
        let mut state = self.state.lock().unwrap();
        if !state.properties.contains_key(property_id) {
            return Err(PapiError::NotFound(format!(
                "property {property_id} not found"
            )));
        }
        state.activations.insert(
            id.clone(),
            Activation {
                activation_id: id.clone(),
                property_id: property_id.into(),
                property_version: version,
                network: new.network.clone(),
                status: activation_status::PENDING.into(),
                note: new.note.clone(),
                notify_emails: new.notify_emails.clone(),
                ..Default::default()
            },
        );
        state.activation_order.push(id.clone());
        Ok(id)
    }

    async fn get_activation(
        &self,
        property_id: &str,
        activation_id: &str,
    ) -> Result<Activation, PapiError> {
        self.record(format!("get_activation({property_id},{activation_id})"));
        let mut state = self.state.lock().unwrap();
        let auto_advance = state.auto_advance;
        let activation = state
            .activations
            .get_mut(activation_id)
            .ok_or_else(|| PapiError::NotFound(format!("activation {activation_id} not found")))?;

        if auto_advance {
            let next = match activation.status.as_str() {
                activation_status::PENDING => activation_status::ACTIVATING,
                activation_status::ACTIVATING => activation_status::ACTIVE,
                other => other,
            }
            .to_string();
            activation.status = next;
        }
        let activation = activation.clone();

        if activation.status == activation_status::ACTIVE {
            if let Some(property) = state.properties.get_mut(property_id) {
                match activation.network.as_str() {
                    "STAGING" => property.staging_version = activation.property_version,
                    _ => property.production_version = activation.property_version,
                }
            }
        }
        Ok(activation)
    }

    async fn list_activations(&self, property_id: &str) -> Result<Vec<Activation>, PapiError> {
        self.record(format!("list_activations({property_id})"));
        let state = self.state.lock().unwrap();
        Ok(state
            .activation_order
            .iter()
            .filter_map(|id| state.activations.get(id))
            .filter(|a| a.property_id == property_id)
            .cloned()
            .collect())
    }
}
