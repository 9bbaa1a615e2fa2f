//! Rule tree sync driver.
//!
//! Reads the latest version's tree, compares under normalisation, and only
//! on a real difference resolves an editable target version and writes. The
//! fork decision comes after the diff, so equal trees never bump versions
//! regardless of publication state.

use crds::{phase, CDNProperty, PropertyRules};
use papi_client::{PapiClientTrait, PapiError};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ControllerError;
use crate::rules_compare;
use crate::rules_validation;

use super::{status_mut, status_of, Reconciler};

/// Outcome of comparing desired rules against the remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RulesPlan {
    /// Trees are equal under normalisation; nothing to write.
    UpToDate,
    /// A write is required against `target_version` with `etag`.
    Update {
        target_version: i64,
        forked: bool,
        etag: String,
    },
}

/// Decides whether and where to write the desired tree. Forks only after a
/// real difference is established.
pub(crate) async fn plan_rules_update(
    papi: &dyn PapiClientTrait,
    property_id: &str,
    contract_id: &str,
    group_id: &str,
    latest_version: i64,
    desired: &Value,
) -> Result<RulesPlan, PapiError> {
    let current = papi
        .get_rule_tree(property_id, latest_version, contract_id, group_id)
        .await?;

    if !rules_compare::rules_need_update(desired, &current.rules) {
        return Ok(RulesPlan::UpToDate);
    }

    let (target_version, forked) = super::version::resolve_editable_version(
        papi,
        property_id,
        contract_id,
        group_id,
        latest_version,
    )
    .await?;

    Ok(RulesPlan::Update {
        target_version,
        forked,
        etag: current.etag,
    })
}

impl Reconciler {
    /// Returns true when a write happened. `InvalidRules` failures skip the
    /// write and carry the validation message.
    pub(crate) async fn sync_rules(
        &self,
        property: &mut CDNProperty,
        desired: &PropertyRules,
    ) -> Result<bool, ControllerError> {
        rules_validation::validate(desired).map_err(ControllerError::InvalidRules)?;

        let spec = property.spec.clone();
        let status = status_of(property);
        let desired_tree = serde_json::to_value(desired)?;

        let plan = plan_rules_update(
            self.papi.as_ref(),
            &status.property_id,
            &spec.contract_id,
            &spec.group_id,
            status.latest_version,
            &desired_tree,
        )
        .await?;

        let (target, forked, etag) = match plan {
            RulesPlan::UpToDate => {
                debug!(
                    property_id = %status.property_id,
                    version = status.latest_version,
                    "rules are up to date, no version bump"
                );
                return Ok(false);
            }
            RulesPlan::Update {
                target_version,
                forked,
                etag,
            } => (target_version, forked, etag),
        };

        if forked {
            status_mut(property).latest_version = target;
            self.update_status_with_retry(property).await?;
        }

        info!(property_id = %status.property_id, version = target, "updating rule tree");
        self.update_status(property, phase::UPDATING, "UpdatingPropertyRules", "")
            .await;

        let updated = self
            .papi
            .update_rule_tree(
                &status.property_id,
                target,
                &spec.contract_id,
                &spec.group_id,
                &desired_tree,
                &etag,
            )
            .await?;

        info!(
            property_id = %status.property_id,
            version = target,
            etag = %updated.etag,
            "rule tree updated"
        );
        Ok(true)
    }
}
