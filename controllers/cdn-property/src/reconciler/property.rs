//! Property creation and update paths.

use crds::{phase, CDNProperty, CDNPropertySpec};
use kube_runtime::controller::Action;
use papi_client::{hostnames_differ, EdgeHostnameTemplate, Hostname, NewProperty};
use tracing::{debug, info, warn};

use crate::error::ControllerError;

use super::{status_mut, status_of, Reconciler, REQUEUE_AFTER_CREATE, REQUEUE_STEADY, REQUEUE_TRANSIENT};

impl Reconciler {
    pub(crate) async fn reconcile_property(
        &self,
        property: &mut CDNProperty,
    ) -> Result<Action, ControllerError> {
        if status_of(property).property_id.is_empty() {
            self.create_property(property).await
        } else {
            self.update_property(property).await
        }
    }

    /// Creation path: ensure edge hostnames, create the property, push the
    /// initial hostname set.
    async fn create_property(&self, property: &mut CDNProperty) -> Result<Action, ControllerError> {
        let spec = property.spec.clone();
        info!(property_name = %spec.property_name, "creating remote property");
        self.update_status(property, phase::CREATING, "CreatingProperty", "")
            .await;

        if !spec.hostnames.is_empty() {
            if let Err(e) = self.ensure_edge_hostnames(&spec).await {
                warn!(error = %e, "failed to ensure edge hostnames");
                self.update_status(property, phase::ERROR, "FailedToEnsureEdgeHostnames", &e.to_string())
                    .await;
                return Ok(Action::requeue(REQUEUE_TRANSIENT));
            }
        }

        let property_id = match self
            .papi
            .create_property(&NewProperty {
                property_name: spec.property_name.clone(),
                product_id: spec.product_id.clone(),
                contract_id: spec.contract_id.clone(),
                group_id: spec.group_id.clone(),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "failed to create remote property");
                let (reason, requeue) = Self::failure_requeue(&e, "FailedToCreateProperty");
                self.update_status(property, phase::ERROR, reason, &e.to_string())
                    .await;
                return Ok(Action::requeue(requeue));
            }
        };

        {
            let status = status_mut(property);
            status.property_id = property_id.clone();
            status.latest_version = 1;
            status.phase = phase::READY.to_string();
        }
        self.update_status_with_retry(property).await?;

        if !spec.hostnames.is_empty() {
            let hostnames = to_papi_hostnames(&spec.hostnames);
            if let Err(e) = self
                .papi
                .set_hostnames(&property_id, &spec.contract_id, &spec.group_id, 1, &hostnames)
                .await
            {
                warn!(property_id = %property_id, error = %e, "failed to set initial hostnames");
                self.update_status(property, phase::ERROR, "FailedToSetHostnames", &e.to_string())
                    .await;
                return Ok(Action::requeue(REQUEUE_TRANSIENT));
            }
            info!(property_id = %property_id, count = hostnames.len(), "initial hostnames set");
        }

        info!(property_id = %property_id, "remote property created");
        self.update_status(property, phase::READY, "PropertyCreatedSuccessfully", "")
            .await;
        Ok(Action::requeue(REQUEUE_AFTER_CREATE))
    }

    /// Update path: sync observed versions, push hostname and rule changes
    /// onto an editable version, then drive activation.
    async fn update_property(&self, property: &mut CDNProperty) -> Result<Action, ControllerError> {
        let spec = property.spec.clone();
        let property_id = status_of(property).property_id.clone();

        let current = match self.papi.get_property(&property_id).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => {
                // The remote property vanished under us. Clear the observed
                // state so the next pass recreates from scratch.
                warn!(property_id = %property_id, "remote property not found, will recreate");
                let status = status_mut(property);
                status.property_id.clear();
                status.latest_version = 0;
                status.staging_version = 0;
                status.production_version = 0;
                status.staging_activation_id.clear();
                status.production_activation_id.clear();
                status.staging_activation_status.clear();
                status.production_activation_status.clear();
                status.staging_activation_note.clear();
                status.production_activation_note.clear();
                self.update_status_with_retry(property).await?;
                self.update_status(property, phase::ERROR, "PropertyNotFound",
                    "remote property is gone; it will be recreated")
                    .await;
                return Ok(Action::requeue(REQUEUE_TRANSIENT));
            }
            Err(e) => {
                warn!(property_id = %property_id, error = %e, "failed to retrieve remote property");
                let (reason, requeue) = Self::failure_requeue(&e, "FailedToRetrieveProperty");
                self.update_status(property, phase::ERROR, reason, &e.to_string())
                    .await;
                return Ok(Action::requeue(requeue));
            }
        };

        // Sync observed versions so status reflects activations that
        // completed outside our polling loop.
        let mut synced = false;
        {
            let status = status_mut(property);
            for (field, observed) in [
                (&mut status.latest_version, current.latest_version),
                (&mut status.staging_version, current.staging_version),
                (&mut status.production_version, current.production_version),
            ] {
                if observed != 0 && *field != observed {
                    debug!(old = *field, new = observed, "syncing observed version");
                    *field = observed;
                    synced = true;
                }
            }
        }
        if synced {
            self.update_status_with_retry(property).await?;
        }

        let desired_hostnames = to_papi_hostnames(&spec.hostnames);
        let drift = spec.property_name != current.property_name
            || (!desired_hostnames.is_empty()
                && hostnames_differ(&desired_hostnames, &current.hostnames));
        if drift {
            info!(property_id = %property_id, "property name or hostnames differ, updating");
            self.update_status(property, phase::UPDATING, "UpdatingProperty", "")
                .await;

            if let Err(e) = self.ensure_edge_hostnames(&spec).await {
                warn!(error = %e, "failed to ensure edge hostnames");
                self.update_status(property, phase::ERROR, "FailedToEnsureEdgeHostnames", &e.to_string())
                    .await;
                return Ok(Action::requeue(REQUEUE_TRANSIENT));
            }

            match self.push_hostnames(property, &desired_hostnames).await {
                Ok(()) => {}
                Err(ControllerError::Papi(e)) => {
                    warn!(property_id = %property_id, error = %e, "failed to update hostnames");
                    let (reason, requeue) = Self::failure_requeue(&e, "FailedToSetHostnames");
                    self.update_status(property, phase::ERROR, reason, &e.to_string())
                        .await;
                    return Ok(Action::requeue(requeue));
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(rules) = &spec.rules {
            match self.sync_rules(property, rules).await {
                Ok(true) => info!(property_id = %property_id, "rule tree updated"),
                Ok(false) => debug!(property_id = %property_id, "rule tree up to date"),
                Err(ControllerError::InvalidRules(msg)) => {
                    // Validation is pure and will keep failing until the user
                    // edits the spec, so surface it without a fast requeue.
                    warn!(property_id = %property_id, error = %msg, "desired rules failed validation");
                    self.update_status(property, phase::ERROR, "InvalidRules", &msg)
                        .await;
                }
                Err(ControllerError::Papi(e)) => {
                    warn!(property_id = %property_id, error = %e, "failed to update rules");
                    let (reason, requeue) = Self::failure_requeue(&e, "FailedToUpdateRules");
                    self.update_status(property, phase::ERROR, reason, &e.to_string())
                        .await;
                    return Ok(Action::requeue(requeue));
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(activation) = &spec.activation {
            match self.handle_activation(property, activation).await {
                Ok(Some(action)) => return Ok(action),
                Ok(None) => {}
                Err(ControllerError::Papi(e)) => {
                    warn!(property_id = %property_id, error = %e, "failed to handle activation");
                    let (reason, requeue) = Self::failure_requeue(&e, "FailedToHandleActivation");
                    self.update_status(property, phase::ERROR, reason, &e.to_string())
                        .await;
                    return Ok(Action::requeue(requeue));
                }
                Err(e) => return Err(e),
            }
        }

        self.update_status(property, phase::READY, "PropertyIsReady", "")
            .await;
        Ok(Action::requeue(REQUEUE_STEADY))
    }

    /// Writes the desired hostname set onto an editable version, forking
    /// first when the latest version is published.
    async fn push_hostnames(
        &self,
        property: &mut CDNProperty,
        hostnames: &[Hostname],
    ) -> Result<(), ControllerError> {
        if hostnames.is_empty() {
            return Ok(());
        }
        let spec = property.spec.clone();
        let status = status_of(property);

        let (target, forked) = super::version::resolve_editable_version(
            self.papi.as_ref(),
            &status.property_id,
            &spec.contract_id,
            &spec.group_id,
            status.latest_version,
        )
        .await?;
        if forked {
            status_mut(property).latest_version = target;
            self.update_status_with_retry(property).await?;
        }

        self.papi
            .set_hostnames(&status.property_id, &spec.contract_id, &spec.group_id, target, hostnames)
            .await?;
        info!(property_id = %status.property_id, version = target, "hostnames updated");
        Ok(())
    }

    /// Ensures edge hostnames exist for all `cnameTo` targets. Without a
    /// template, existing edge hostnames are accepted but none are created.
    async fn ensure_edge_hostnames(&self, spec: &CDNPropertySpec) -> Result<(), ControllerError> {
        if spec.hostnames.is_empty() {
            return Ok(());
        }
        let hostnames = to_papi_hostnames(&spec.hostnames);

        match &spec.edge_hostname_template {
            Some(template) => {
                let template = EdgeHostnameTemplate {
                    domain_prefix: template.domain_prefix.clone(),
                    domain_suffix: template.domain_suffix.clone(),
                    secure_network: template.secure_network.clone(),
                    ip_version_behavior: template.ip_version_behavior.clone(),
                };
                self.papi
                    .ensure_edge_hostnames(
                        &hostnames,
                        &template,
                        &spec.product_id,
                        &spec.contract_id,
                        &spec.group_id,
                    )
                    .await?;
                Ok(())
            }
            None => {
                let existing = self
                    .papi
                    .list_edge_hostnames(&spec.contract_id, &spec.group_id)
                    .await?;
                let existing: std::collections::BTreeSet<String> =
                    existing.iter().map(|eh| eh.domain()).collect();
                for hostname in &hostnames {
                    if !existing.contains(&hostname.cname_to) {
                        return Err(ControllerError::InvalidConfig(format!(
                            "edge hostname {} does not exist and no edgeHostnameTemplate is set",
                            hostname.cname_to
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn to_papi_hostnames(hostnames: &[crds::Hostname]) -> Vec<Hostname> {
    hostnames
        .iter()
        .map(|h| Hostname {
            cname_from: h.cname_from.clone(),
            cname_to: h.cname_to.clone(),
            cert_provisioning_type: h.cert_provisioning_type.clone().unwrap_or_default(),
        })
        .collect()
}
