//! CDN Property Controller
//!
//! Reconciles cluster-scoped `CDNProperty` resources against the remote
//! Property Manager API: property creation, version lifecycle, hostname and
//! rule-tree synchronization, and per-network activation jobs.

mod backoff;
mod controller;
mod error;
mod reconciler;
mod rules_compare;
mod rules_validation;
mod watcher;

use crate::controller::Controller;
use crate::error::ControllerError;
use papi_client::EdgeGridCredentials;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting CDN property controller");

    let credentials = EdgeGridCredentials::from_env()
        .map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;
    info!(host = %credentials.host, "EdgeGrid credentials loaded");

    let controller = Controller::new(credentials).await?;
    controller.run().await
}
