//! Status writes.
//!
//! Two entry points: a structured merge (`update_status`) that sets phase
//! and the Ready condition while preserving observed values, and a full
//! overwrite (`update_status_with_retry`) for persisting freshly observed
//! state. Both re-read the object first (stale resourceVersions are the
//! norm: users edit spec while a reconcile is in flight) and retry conflicts
//! with a short linear backoff. Writes that would change nothing are
//! skipped to avoid write amplification.

use chrono::{DateTime, Utc};
use crds::{phase, CDNProperty, CDNPropertyStatus, PropertyCondition, CONDITION_TYPE_READY};
use kube::api::PostParams;
use kube::ResourceExt;
use tracing::{debug, error};

use crate::error::ControllerError;

use super::Reconciler;

const MAX_RETRIES: u32 = 3;

impl Reconciler {
    /// Merge-style status update: sets the phase and Ready condition on a
    /// freshly read object, preserving observed non-zero values from the
    /// in-memory copy. Failures are logged, not propagated.
    pub(crate) async fn update_status(
        &self,
        property: &mut CDNProperty,
        phase: &str,
        reason: &str,
        message: &str,
    ) {
        let name = property.name_any();
        let in_memory = property.status.clone().unwrap_or_default();

        for attempt in 1..=MAX_RETRIES {
            let mut latest = match self.api.get(&name).await {
                Ok(latest) => latest,
                Err(e) => {
                    error!(name = %name, attempt, error = %e, "failed to re-read resource for status update");
                    return;
                }
            };
            let mut status = latest.status.take().unwrap_or_default();

            let mut changed = status.phase != phase;
            status.phase = phase.to_string();
            changed |= merge_observed(&mut status, &in_memory);

            let now = Utc::now();
            let condition_changed =
                upsert_ready_condition(&mut status.conditions, phase, reason, message, now);

            if !changed && !condition_changed {
                debug!(name = %name, phase, reason, "status unchanged, skipping update");
                property.status = Some(status);
                property.metadata.resource_version = latest.metadata.resource_version.clone();
                return;
            }
            status.last_updated = Some(now);
            latest.status = Some(status);

            let body = match serde_json::to_vec(&latest) {
                Ok(body) => body,
                Err(e) => {
                    error!(name = %name, error = %e, "failed to serialize status");
                    return;
                }
            };
            match self.api.replace_status(&name, &PostParams::default(), body).await {
                Ok(updated) => {
                    property.status = updated.status;
                    property.metadata.resource_version = updated.metadata.resource_version;
                    debug!(name = %name, phase, reason, "status updated");
                    return;
                }
                Err(e) if attempt < MAX_RETRIES => {
                    debug!(name = %name, attempt, error = %e, "status update conflicted, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(name = %name, error = %e, "failed to update status after retries");
                    return;
                }
            }
        }
    }

    /// Overwrite-style status update: persists the in-memory status verbatim
    /// onto the latest read of the object. Propagates the final failure.
    pub(crate) async fn update_status_with_retry(
        &self,
        property: &mut CDNProperty,
    ) -> Result<(), ControllerError> {
        let name = property.name_any();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut latest = self.api.get(&name).await?;
            latest.status = property.status.clone();

            let body = serde_json::to_vec(&latest)?;
            match self.api.replace_status(&name, &PostParams::default(), body).await {
                Ok(updated) => {
                    property.status = updated.status;
                    property.metadata.resource_version = updated.metadata.resource_version;
                    return Ok(());
                }
                Err(e) if attempt < MAX_RETRIES => {
                    debug!(name = %name, attempt, error = %e, "status update conflicted, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Copies observed values from the in-memory status into `target` where the
/// target still has the zero value. A concurrent reconcile that completed
/// first must not be clobbered with zeros. Returns true when anything moved.
pub(crate) fn merge_observed(target: &mut CDNPropertyStatus, source: &CDNPropertyStatus) -> bool {
    let mut changed = false;

    let string_fields = [
        (&mut target.property_id, &source.property_id),
        (&mut target.staging_activation_id, &source.staging_activation_id),
        (&mut target.production_activation_id, &source.production_activation_id),
        (&mut target.staging_activation_status, &source.staging_activation_status),
        (&mut target.production_activation_status, &source.production_activation_status),
        (&mut target.staging_activation_note, &source.staging_activation_note),
        (&mut target.production_activation_note, &source.production_activation_note),
    ];
    for (target_field, source_field) in string_fields {
        if target_field.is_empty() && !source_field.is_empty() {
            *target_field = source_field.clone();
            changed = true;
        }
    }

    let version_fields = [
        (&mut target.latest_version, source.latest_version),
        (&mut target.staging_version, source.staging_version),
        (&mut target.production_version, source.production_version),
    ];
    for (target_field, source_field) in version_fields {
        if *target_field == 0 && source_field != 0 {
            *target_field = source_field;
            changed = true;
        }
    }

    changed
}

/// Updates or appends the Ready condition. `lastTransitionTime` advances
/// only when status, reason, or message changed. Returns true on change.
pub(crate) fn upsert_ready_condition(
    conditions: &mut Vec<PropertyCondition>,
    phase: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> bool {
    let status = if phase == phase::READY { "True" } else { "False" };
    let mut condition = PropertyCondition {
        type_: CONDITION_TYPE_READY.to_string(),
        status: status.to_string(),
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time: Some(now),
    };

    for existing in conditions.iter_mut() {
        if existing.type_ == condition.type_ {
            let changed = existing.status != condition.status
                || existing.reason != condition.reason
                || existing.message != condition.message;
            if !changed {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
            return changed;
        }
    }

    conditions.push(condition);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_preserves_observed_values_over_zeros() {
        let mut target = CDNPropertyStatus::default();
        let source = CDNPropertyStatus {
            property_id: "prp_42".into(),
            latest_version: 3,
            staging_version: 2,
            staging_activation_id: "atv_1".into(),
            staging_activation_note: "deploy 2".into(),
            ..Default::default()
        };

        assert!(merge_observed(&mut target, &source));
        assert_eq!(target.property_id, "prp_42");
        assert_eq!(target.latest_version, 3);
        assert_eq!(target.staging_version, 2);
        assert_eq!(target.staging_activation_id, "atv_1");
        assert_eq!(target.staging_activation_note, "deploy 2");
    }

    #[test]
    fn merge_never_overwrites_existing_values() {
        let mut target = CDNPropertyStatus {
            property_id: "prp_42".into(),
            latest_version: 5,
            ..Default::default()
        };
        let source = CDNPropertyStatus {
            property_id: "prp_other".into(),
            latest_version: 3,
            ..Default::default()
        };

        assert!(!merge_observed(&mut target, &source));
        assert_eq!(target.property_id, "prp_42");
        assert_eq!(target.latest_version, 5);
    }

    #[test]
    fn ready_condition_tracks_phase() {
        let mut conditions = Vec::new();
        let now = Utc::now();

        assert!(upsert_ready_condition(&mut conditions, phase::READY, "PropertyIsReady", "", now));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, "True");

        assert!(upsert_ready_condition(&mut conditions, phase::ERROR, "RemoteError", "boom", now));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, "False");
        assert_eq!(conditions[0].reason, "RemoteError");
    }

    #[test]
    fn transition_time_only_advances_on_change() {
        let mut conditions = Vec::new();
        let first = Utc::now();
        upsert_ready_condition(&mut conditions, phase::READY, "PropertyIsReady", "", first);

        let later = first + chrono::Duration::minutes(10);
        let changed =
            upsert_ready_condition(&mut conditions, phase::READY, "PropertyIsReady", "", later);
        assert!(!changed);
        assert_eq!(conditions[0].last_transition_time, Some(first));

        let changed =
            upsert_ready_condition(&mut conditions, phase::ERROR, "RemoteError", "", later);
        assert!(changed);
        assert_eq!(conditions[0].last_transition_time, Some(later));
    }
}
