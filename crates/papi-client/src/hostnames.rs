//! Hostname comparison and edge hostname derivation
//!
//! Hostname identity is `cname_from`; order is irrelevant. An empty desired
//! `cert_provisioning_type` matches whatever the remote side reports.

use std::collections::HashMap;

use crate::error::PapiError;
use crate::models::{EdgeHostnameTemplate, Hostname};

/// Returns true when the two hostname sets differ: a `cname_from` added or
/// removed, a `cname_to` changed, or a non-empty desired cert type that
/// disagrees with the current one.
pub fn hostnames_differ(desired: &[Hostname], current: &[Hostname]) -> bool {
    if desired.len() != current.len() {
        return true;
    }

    let current_by_cname: HashMap<&str, &Hostname> = current
        .iter()
        .map(|h| (h.cname_from.as_str(), h))
        .collect();

    for d in desired {
        let Some(c) = current_by_cname.get(d.cname_from.as_str()) else {
            return true;
        };
        if d.cname_to != c.cname_to {
            return true;
        }
        if !d.cert_provisioning_type.is_empty()
            && d.cert_provisioning_type != c.cert_provisioning_type
        {
            return true;
        }
    }

    false
}

/// Splits an edge hostname domain into `(prefix, suffix)` for creation.
///
/// When the domain ends with the template's suffix, the split is anchored
/// there, so deep prefixes like `a.b.c.edgekey.net` keep their full prefix.
/// Otherwise the domain is split at the first dot, matching how single-label
/// prefixes are conventionally written.
pub fn split_edge_hostname(
    domain: &str,
    template: &EdgeHostnameTemplate,
) -> Result<(String, String), PapiError> {
    let suffix = template.domain_suffix.trim_matches('.');
    if !suffix.is_empty() {
        if let Some(prefix) = domain.strip_suffix(&format!(".{suffix}")) {
            if !prefix.is_empty() {
                return Ok((prefix.to_string(), suffix.to_string()));
            }
        }
    }

    match domain.split_once('.') {
        Some((prefix, rest)) if !prefix.is_empty() && !rest.is_empty() => {
            Ok((prefix.to_string(), rest.to_string()))
        }
        _ => Err(PapiError::InvalidRequest(format!(
            "invalid edge hostname format: {domain}"
        ))),
    }
}
