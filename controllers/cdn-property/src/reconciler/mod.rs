//! Reconciliation logic for CDNProperty resources.
//!
//! One reconcile pass drives the remote property toward the declared state:
//! deletion (behind the finalizer), creation, hostname and rule-tree sync
//! with lazy version forking, and the per-network activation state machine.
//!
//! Module layout:
//! - `property`: creation and update paths
//! - `version`: target-version resolution (reuse editable vs fork)
//! - `rules`: rule-tree sync driver
//! - `activation`: activation decision and polling
//! - `status`: conflict-retrying, change-suppressing status writes

pub mod activation;
pub mod property;
pub mod rules;
pub mod status;
pub mod version;

#[cfg(test)]
mod activation_test;
#[cfg(test)]
mod rules_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crds::{phase, CDNProperty, CDNPropertyStatus, FINALIZER_NAME};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use papi_client::{PapiClientTrait, PapiError};
use tracing::{info, warn};

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;

/// Requeue cadences per reconcile outcome.
pub(crate) const REQUEUE_STEADY: Duration = Duration::from_secs(30 * 60);
pub(crate) const REQUEUE_AFTER_CREATE: Duration = Duration::from_secs(10 * 60);
pub(crate) const REQUEUE_ACTIVATION_POLL: Duration = Duration::from_secs(2 * 60);
pub(crate) const REQUEUE_TRANSIENT: Duration = Duration::from_secs(2 * 60);
pub(crate) const REQUEUE_AUTH: Duration = Duration::from_secs(5 * 60);
pub(crate) const REQUEUE_ACTIVATION_FAILED: Duration = Duration::from_secs(5 * 60);

/// Reconciles CDNProperty resources against the Property Manager API.
pub struct Reconciler {
    pub(crate) papi: Box<dyn PapiClientTrait>,
    pub(crate) api: Api<CDNProperty>,
    /// Per-resource backoff used by the watcher's error policy.
    backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl Reconciler {
    pub fn new(papi: impl PapiClientTrait + 'static, api: Api<CDNProperty>) -> Self {
        Self {
            papi: Box::new(papi),
            api,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Entry point for one reconcile pass. Returns the requeue decision.
    pub async fn reconcile(&self, property: Arc<CDNProperty>) -> Result<Action, ControllerError> {
        let name = property
            .metadata
            .name
            .clone()
            .ok_or_else(|| ControllerError::InvalidConfig("CDNProperty missing name".to_string()))?;

        // Work on a deep copy; status helpers refresh it as they write.
        let mut property = (*property).clone();

        if property.metadata.deletion_timestamp.is_some() {
            return self.handle_deletion(&mut property).await;
        }

        if !property.finalizers().iter().any(|f| f == FINALIZER_NAME) {
            self.add_finalizer(&name, &property).await?;
            // The metadata update redrives the reconcile.
            return Ok(Action::await_change());
        }

        let action = self.reconcile_property(&mut property).await?;
        self.reset_backoff(&name);
        Ok(action)
    }

    /// Deletion path: remove the remote property (if it exists), then drop
    /// the finalizer so the cluster can collect the object.
    async fn handle_deletion(&self, property: &mut CDNProperty) -> Result<Action, ControllerError> {
        let name = property.name_any();
        if !property.finalizers().iter().any(|f| f == FINALIZER_NAME) {
            return Ok(Action::await_change());
        }

        self.update_status(property, phase::DELETING, "DeletingProperty", "")
            .await;

        let property_id = status_of(property).property_id.clone();
        if !property_id.is_empty() {
            info!(name = %name, property_id = %property_id, "deleting remote property");
            match self.papi.remove_property(&property_id).await {
                Ok(()) => {
                    info!(property_id = %property_id, "remote property deleted");
                }
                Err(e) if e.is_not_found() => {
                    info!(property_id = %property_id, "remote property already gone");
                }
                Err(e) => {
                    warn!(property_id = %property_id, error = %e, "failed to delete remote property");
                    self.update_status(property, phase::ERROR, "FailedToDeleteProperty", &e.to_string())
                        .await;
                    return Ok(Action::requeue(REQUEUE_TRANSIENT));
                }
            }
        }

        self.remove_finalizer(&name, property).await?;
        Ok(Action::await_change())
    }

    async fn add_finalizer(&self, name: &str, property: &CDNProperty) -> Result<(), ControllerError> {
        let mut finalizers = property.finalizers().to_vec();
        finalizers.push(FINALIZER_NAME.to_string());
        self.patch_finalizers(name, finalizers).await
    }

    async fn remove_finalizer(&self, name: &str, property: &CDNProperty) -> Result<(), ControllerError> {
        let finalizers: Vec<String> = property
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != FINALIZER_NAME)
            .cloned()
            .collect();
        self.patch_finalizers(name, finalizers).await
    }

    async fn patch_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<(), ControllerError> {
        let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
        self.api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Maps a remote error to a status reason and requeue delay.
    pub(crate) fn failure_requeue<'a>(
        error: &PapiError,
        fallback_reason: &'a str,
    ) -> (&'a str, Duration) {
        if error.is_authentication() {
            ("AuthFailed", REQUEUE_AUTH)
        } else if error.is_conflict() {
            ("WriteConflict", REQUEUE_TRANSIENT)
        } else {
            (fallback_reason, REQUEUE_TRANSIENT)
        }
    }

    /// Next backoff for a resource key; used by the watcher error policy.
    pub fn next_backoff(&self, key: &str) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(key.to_string())
                .or_insert_with(|| FibonacciBackoff::new(1, 10))
                .next_backoff(),
            Err(e) => {
                warn!(error = %e, "failed to lock backoff states, using default");
                Duration::from_secs(60)
            }
        }
    }

    /// Resets the backoff after a successful reconcile.
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(key) {
                state.reset();
            }
        }
    }
}

/// Snapshot of the status, defaulted when unset.
pub(crate) fn status_of(property: &CDNProperty) -> CDNPropertyStatus {
    property.status.clone().unwrap_or_default()
}

/// Mutable status access, initializing an empty status on first touch.
pub(crate) fn status_mut(property: &mut CDNProperty) -> &mut CDNPropertyStatus {
    property.status.get_or_insert_with(CDNPropertyStatus::default)
}
