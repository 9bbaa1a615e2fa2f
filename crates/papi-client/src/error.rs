//! PAPI client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Property Manager API
#[derive(Debug, Error)]
pub enum PapiError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status
    #[error("PAPI error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication or authorization failed (401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency failure (409/412, stale etag)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request could not be constructed (missing fields, bad hostnames)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials missing or malformed at construction time
    #[error("Invalid credentials: {0}")]
    Credentials(String),
}

impl PapiError {
    /// True when the remote reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PapiError::NotFound(_))
    }

    /// True when the failure was an etag/concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PapiError::Conflict(_))
    }

    /// True on credential problems (401/403).
    pub fn is_authentication(&self) -> bool {
        matches!(self, PapiError::Authentication(_))
    }
}
