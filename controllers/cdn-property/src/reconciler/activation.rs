//! Activation state machine for one network.
//!
//! Starting an activation needs two signals once a prior one completed: the
//! note must change, and either a newer version must exist or nothing is
//! active yet. Version alone would re-publish on every rule edit; note alone
//! has nothing new to publish. The note recorded in status is the pre-image
//! for the next comparison, persisted before the reconcile returns.

use crds::{phase, ActivationSpec, CDNProperty};
use kube_runtime::controller::Action;
use papi_client::{activation_status, NewActivation};
use tracing::{info, warn};

use crate::error::ControllerError;

use super::{
    status_mut, status_of, Reconciler, REQUEUE_ACTIVATION_FAILED, REQUEUE_ACTIVATION_POLL,
};

/// Inputs to the pure activation decision, extracted from status and spec.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActivationState {
    pub activation_id: String,
    pub activation_status: String,
    pub activation_note: String,
    pub active_version: i64,
    pub latest_version: i64,
    pub desired_note: String,
}

impl ActivationState {
    /// Extracts the decision inputs for one network from the status.
    pub(crate) fn from_status(
        status: &crds::CDNPropertyStatus,
        network: crds::ActivationNetwork,
        desired_note: &str,
    ) -> Self {
        let view = status.activation_for(network);
        Self {
            activation_id: view.activation_id.to_string(),
            activation_status: view.activation_status.to_string(),
            activation_note: view.activation_note.to_string(),
            active_version: view.active_version,
            latest_version: status.latest_version,
            desired_note: desired_note.to_string(),
        }
    }
}

/// What this reconcile should do for the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActivationDecision {
    /// Start a new activation at `latest_version`.
    Start,
    /// An activation is in flight; poll it.
    Poll,
    /// Nothing to do.
    Wait,
}

/// The activation decision procedure.
///
/// - No version yet: wait.
/// - No prior activation: start (initial deployments need no note change).
/// - Prior activation in flight: poll; never start a second one.
/// - Prior activation completed: start iff the note changed AND (a newer
///   version exists or no version is active yet).
pub(crate) fn activation_decision(state: &ActivationState) -> ActivationDecision {
    if state.latest_version == 0 {
        return ActivationDecision::Wait;
    }
    if state.activation_id.is_empty() {
        return ActivationDecision::Start;
    }
    if activation_status::is_in_flight(&state.activation_status) {
        return ActivationDecision::Poll;
    }

    let note_changed = state.desired_note != state.activation_note;
    let version_changed = state.latest_version > state.active_version;
    if note_changed && (version_changed || state.active_version == 0) {
        ActivationDecision::Start
    } else {
        ActivationDecision::Wait
    }
}

impl Reconciler {
    /// Drives the activation machine. Returns a requeue override while an
    /// activation is pending or failed; `None` falls through to the steady
    /// cadence.
    pub(crate) async fn handle_activation(
        &self,
        property: &mut CDNProperty,
        activation: &ActivationSpec,
    ) -> Result<Option<Action>, ControllerError> {
        let network = activation.network;
        let status = status_of(property);
        let state = ActivationState::from_status(
            &status,
            network,
            activation.note.as_deref().unwrap_or_default(),
        );

        match activation_decision(&state) {
            ActivationDecision::Wait => Ok(None),
            ActivationDecision::Start => {
                self.start_activation(property, activation, state.latest_version)
                    .await?;
                Ok(Some(Action::requeue(REQUEUE_ACTIVATION_POLL)))
            }
            ActivationDecision::Poll => self.poll_activation(property, activation, &state).await,
        }
    }

    /// Polls the in-flight activation and mirrors its status.
    async fn poll_activation(
        &self,
        property: &mut CDNProperty,
        activation: &ActivationSpec,
        state: &ActivationState,
    ) -> Result<Option<Action>, ControllerError> {
        let network = activation.network;
        let property_id = status_of(property).property_id.clone();

        let remote = match self
            .papi
            .get_activation(&property_id, &state.activation_id)
            .await
        {
            Ok(remote) => remote,
            Err(e) => {
                // Transient poll failure: keep the in-flight marker and try
                // again shortly; the next pass re-reads remote state.
                warn!(property_id = %property_id, activation_id = %state.activation_id,
                    error = %e, "failed to poll activation");
                return Ok(Some(Action::requeue(REQUEUE_ACTIVATION_POLL)));
            }
        };

        {
            let status = status_mut(property);
            match network {
                crds::ActivationNetwork::Staging => {
                    status.staging_activation_status = remote.status.clone();
                    if remote.status == activation_status::ACTIVE {
                        status.staging_version = remote.property_version;
                    }
                }
                crds::ActivationNetwork::Production => {
                    status.production_activation_status = remote.status.clone();
                    if remote.status == activation_status::ACTIVE {
                        status.production_version = remote.property_version;
                    }
                }
            }
        }
        self.update_status_with_retry(property).await?;

        match remote.status.as_str() {
            activation_status::ACTIVE => {
                info!(network = %network, version = remote.property_version,
                    "activation completed");
                // The in-flight job may have completed for an older version.
                // A follow-up for the newer one still needs the user-visible
                // note signal, otherwise edits would self-promote forever.
                let note_changed =
                    activation.note.clone().unwrap_or_default() != state.activation_note;
                if remote.property_version < state.latest_version && note_changed {
                    info!(network = %network, version = state.latest_version,
                        "completed activation is stale, starting follow-up");
                    self.start_activation(property, activation, state.latest_version)
                        .await?;
                    return Ok(Some(Action::requeue(REQUEUE_ACTIVATION_POLL)));
                }
                Ok(None)
            }
            activation_status::FAILED => {
                warn!(network = %network, activation_id = %state.activation_id, "activation failed");
                self.update_status(property, phase::ERROR, "ActivationFailed",
                    "activation failed; check the activation log on the CDN side")
                    .await;
                Ok(Some(Action::requeue(REQUEUE_ACTIVATION_FAILED)))
            }
            other => {
                // PENDING/ACTIVATING and vendor-specific states are treated
                // as non-terminal.
                info!(network = %network, status = other, "activation in progress");
                self.update_status(property, phase::ACTIVATING, "ActivationInProgress",
                    &format!("status: {other}"))
                    .await;
                Ok(Some(Action::requeue(REQUEUE_ACTIVATION_POLL)))
            }
        }
    }

    /// Starts (or adopts) an activation and records the id, PENDING status,
    /// and note pre-image before returning.
    async fn start_activation(
        &self,
        property: &mut CDNProperty,
        activation: &ActivationSpec,
        version: i64,
    ) -> Result<(), ControllerError> {
        let network = activation.network;
        let spec = property.spec.clone();
        let property_id = status_of(property).property_id.clone();
        let note = activation.note.clone().unwrap_or_default();

        info!(network = %network, version, "starting activation");
        self.update_status(property, phase::ACTIVATING, "StartingActivation",
            &format!("activating version {version} on {network}"))
            .await;

        // A job started by an earlier pass whose status write was lost would
        // otherwise be duplicated; adopt it instead.
        let (activation_id, activation_state, recorded_note) = match self
            .papi
            .pending_activation(&property_id, network.as_str())
            .await
        {
            Ok(Some(existing)) => {
                info!(activation_id = %existing.activation_id, "adopting in-flight activation");
                (existing.activation_id, existing.status, existing.note)
            }
            Ok(None) | Err(_) => {
                let id = self
                    .papi
                    .create_activation(
                        &property_id,
                        version,
                        &NewActivation {
                            network: network.as_str().to_string(),
                            note: note.clone(),
                            notify_emails: activation.notify_emails.clone(),
                            acknowledge_all_warnings: activation
                                .acknowledge_all_warnings
                                .unwrap_or(false),
                            use_fast_fallback: activation.use_fast_fallback.unwrap_or(false),
                            fast_push: activation.fast_push,
                            ignore_http_errors: activation.ignore_http_errors,
                        },
                        &spec.contract_id,
                        &spec.group_id,
                    )
                    .await?;
                (id, activation_status::PENDING.to_string(), note)
            }
        };

        {
            let status = status_mut(property);
            match network {
                crds::ActivationNetwork::Staging => {
                    status.staging_activation_id = activation_id.clone();
                    status.staging_activation_status = activation_state;
                    status.staging_activation_note = recorded_note;
                }
                crds::ActivationNetwork::Production => {
                    status.production_activation_id = activation_id.clone();
                    status.production_activation_status = activation_state;
                    status.production_activation_note = recorded_note;
                }
            }
        }
        self.update_status_with_retry(property).await?;

        info!(activation_id = %activation_id, network = %network, "activation started");
        Ok(())
    }
}
