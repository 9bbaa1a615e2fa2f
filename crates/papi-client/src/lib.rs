//! Akamai Property Manager API (PAPI) client
//!
//! A Rust client for the PAPI REST endpoints the CDN property operator
//! consumes: properties, versions, rule trees, hostnames, edge hostnames,
//! and activations. Requests are signed with EdgeGrid authentication.
//!
//! # Example
//!
//! ```no_run
//! use papi_client::{EdgeGridCredentials, NewProperty, PapiClient, PapiClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = EdgeGridCredentials::from_env()?;
//! let client = PapiClient::new(credentials)?;
//!
//! let property_id = client
//!     .create_property(&NewProperty {
//!         property_name: "www.example.com".into(),
//!         product_id: "prd_Fresca".into(),
//!         contract_id: "ctr_C-1ED34DY".into(),
//!         group_id: "grp_123456".into(),
//!     })
//!     .await?;
//!
//! let property = client.get_property(&property_id).await?;
//! println!("latest version: {}", property.latest_version);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Property lifecycle**: create, read (with best-effort hostnames),
//!   version forking, removal
//! - **Rule trees**: etag-guarded reads and writes with a one-shot
//!   validation-mode fallback
//! - **Edge hostnames**: list, create, ensure-exists for hostname targets
//! - **Activations**: start and poll per-network activation jobs

pub mod auth;
pub mod client;
pub mod error;
pub mod hostnames;
pub mod links;
pub mod models;
#[path = "trait.rs"]
pub mod papi_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use auth::EdgeGridCredentials;
pub use client::PapiClient;
pub use error::PapiError;
pub use hostnames::hostnames_differ;
pub use models::*;
pub use papi_trait::PapiClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockPapiClient;
