//! CDN property operator CRD definitions.
//!
//! A single cluster-scoped resource, `CDNProperty`, describes one managed
//! property on the CDN: its identity, hostnames, rule tree, and an optional
//! activation request. The controller reconciles it against the remote
//! property manager API.

pub mod cdn_property;
pub mod rules;

pub use cdn_property::*;
pub use rules::*;
