//! Controller-specific error types.

use papi_client::PapiError;
use thiserror::Error;

/// Errors that can occur in the CDN property controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Property Manager API error
    #[error("PAPI error: {0}")]
    Papi(#[from] PapiError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration (missing metadata, credentials, templates)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The desired rule tree failed validation
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
