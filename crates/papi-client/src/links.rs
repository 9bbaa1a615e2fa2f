//! Link parsing
//!
//! PAPI create endpoints answer with relative links instead of identifiers:
//!
//! ```text
//! /papi/v1/properties/prp_123456?contractId=ctr_x&groupId=grp_x
//! /papi/v1/properties/prp_123456/versions/4?contractId=ctr_x
//! /papi/v1/properties/prp_123456/activations/atv_789?contractId=ctr_x
//! ```
//!
//! The identifier is the path segment after the collection name, stripped of
//! any query string.

use crate::error::PapiError;

/// Returns the path segment following `marker`, without query parameters.
fn segment_after<'a>(link: &'a str, marker: &str) -> Option<&'a str> {
    let mut parts = link.split('/');
    while let Some(part) = parts.next() {
        if part == marker {
            let value = parts.next()?;
            let value = value.split('?').next().unwrap_or(value);
            if value.is_empty() {
                return None;
            }
            return Some(value);
        }
    }
    None
}

/// Extracts the property id from a `propertyLink`.
pub fn property_id_from_link(link: &str) -> Result<String, PapiError> {
    segment_after(link, "properties")
        .map(str::to_string)
        .ok_or_else(|| PapiError::InvalidRequest(format!("invalid property link: {link}")))
}

/// Extracts the activation id from an `activationLink`.
pub fn activation_id_from_link(link: &str) -> Result<String, PapiError> {
    segment_after(link, "activations")
        .map(str::to_string)
        .ok_or_else(|| PapiError::InvalidRequest(format!("invalid activation link: {link}")))
}

/// Extracts the version number from a `versionLink`.
pub fn version_from_link(link: &str) -> Result<i64, PapiError> {
    let segment = segment_after(link, "versions")
        .ok_or_else(|| PapiError::InvalidRequest(format!("invalid version link: {link}")))?;
    segment
        .parse()
        .map_err(|_| PapiError::InvalidRequest(format!("invalid version link: {link}")))
}

/// Extracts the edge hostname id from an `edgeHostnameLink`.
pub fn edge_hostname_id_from_link(link: &str) -> Result<String, PapiError> {
    segment_after(link, "edgehostnames")
        .map(str::to_string)
        .ok_or_else(|| PapiError::InvalidRequest(format!("invalid edge hostname link: {link}")))
}
