//! Target-version resolution.
//!
//! Mutations (hostnames, rules) must land on a version that is not published
//! on either network. The editable latest version is reused; a published one
//! is forked. Forking is lazy: callers only resolve a target after they have
//! established that a mutation is actually required, so idempotent no-ops
//! never create versions.

use papi_client::{PapiClientTrait, PapiError};
use tracing::info;

/// Returns the version mutations should target and whether a fork happened.
/// After a fork the caller must persist `latest_version` before writing.
pub(crate) async fn resolve_editable_version(
    papi: &dyn PapiClientTrait,
    property_id: &str,
    contract_id: &str,
    group_id: &str,
    latest_version: i64,
) -> Result<(i64, bool), PapiError> {
    match papi.version_published_on(property_id, latest_version).await? {
        None => Ok((latest_version, false)),
        Some(network) => {
            info!(
                property_id,
                latest_version,
                published_on = %network,
                "latest version is published, forking a new version"
            );
            let new_version = papi
                .create_property_version(property_id, contract_id, group_id, latest_version)
                .await?;
            info!(property_id, new_version, "created new property version");
            Ok((new_version, true))
        }
    }
}
