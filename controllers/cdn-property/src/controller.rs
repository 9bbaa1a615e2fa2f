//! Main controller implementation.
//!
//! Wires the Kubernetes client, the PAPI client, the reconciler, and the
//! watcher together, and runs until the watcher exits.

use std::sync::Arc;

use crds::CDNProperty;
use kube::{Api, Client};
use papi_client::{EdgeGridCredentials, PapiClient, PapiClientTrait};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;

/// Long-running controller process state.
pub struct Controller {
    watcher_handle: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Builds the clients and starts the watcher task.
    pub async fn new(credentials: EdgeGridCredentials) -> Result<Self, ControllerError> {
        info!("Initializing CDN property controller");

        let kube_client = Client::try_default().await?;
        let papi_client = PapiClient::new(credentials)?;
        info!(base_url = papi_client.base_url(), "PAPI client initialized");

        let api: Api<CDNProperty> = Api::all(kube_client);
        let reconciler = Arc::new(Reconciler::new(papi_client, api.clone()));
        let watcher = Watcher::new(reconciler, api);

        let watcher_handle = tokio::spawn(async move { watcher.watch_cdn_properties().await });

        Ok(Self { watcher_handle })
    }

    /// Runs until the watcher exits (it should run forever).
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("CDN property controller running");
        match self.watcher_handle.await {
            Ok(result) => result,
            Err(e) => Err(ControllerError::Watch(format!(
                "CDNProperty watcher panicked: {e}"
            ))),
        }
    }
}
