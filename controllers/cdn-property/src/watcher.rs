//! CDNProperty watcher.
//!
//! Runs a `kube_runtime::Controller` over the CDNProperty API: automatic
//! reconnection, per-key serialisation (at most one in-flight reconcile per
//! resource), debounced event batching, and bounded concurrency across
//! different keys.

use std::sync::Arc;
use std::time::Duration;

use crds::CDNProperty;
use futures::StreamExt;
use kube::Api;
use kube::ResourceExt;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{watcher, Controller};
use tracing::{debug, error, info};

use crate::error::ControllerError;
use crate::reconciler::Reconciler;

/// Watches CDNProperty resources and drives the reconciler.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    api: Api<CDNProperty>,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, api: Api<CDNProperty>) -> Self {
        Self { reconciler, api }
    }

    /// Runs the watch loop until the stream ends.
    pub async fn watch_cdn_properties(&self) -> Result<(), ControllerError> {
        info!("Starting CDNProperty watcher");

        let reconcile = |property: Arc<CDNProperty>, ctx: Arc<Reconciler>| async move {
            debug!(name = %property.name_any(), "reconciling CDNProperty");
            ctx.reconcile(property).await
        };

        // Failed reconciles requeue with per-resource Fibonacci backoff.
        let error_policy = |property: Arc<CDNProperty>, error: &ControllerError, ctx: Arc<Reconciler>| {
            let name = property.name_any();
            let backoff = ctx.next_backoff(&name);
            error!(name = %name, error = %error, requeue_secs = backoff.as_secs(),
                "reconciliation failed");
            Action::requeue(backoff)
        };

        // Debounce batches bursts of status updates; two keys reconcile
        // concurrently at most, which is plenty against a rate-limited API.
        let config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(2);

        Controller::new(self.api.clone(), watcher::Config::default())
            .with_config(config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => debug!(name = %object.name, "reconcile finished"),
                    Err(e) => error!(error = %e, "controller error"),
                }
            })
            .await;

        Ok(())
    }
}
