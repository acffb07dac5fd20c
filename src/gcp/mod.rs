//! GCP API interaction module
//!
//! The remote collaborator behind the resource cache: authentication, the
//! HTTP client and the [`ResourceApi`](crate::resource::ResourceApi)
//! implementation for the Google Cloud REST APIs.
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials, token caching, gcloud defaults
//! - [`client`] - URL building from the resource catalog, paginated listing
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use tgcp_cache::gcp::client::GcpClient;
//! use tgcp_cache::resource::{get_resource, ResourceApi};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("us-central1-a").await?;
//!     let def = get_resource("compute-instances").unwrap();
//!     let instances = client.list(def, "my-project", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use auth::GcpCredentials;
pub use client::{Endpoints, GcpClient, ALL_ZONES};
pub use http::{format_gcp_error, ApiStatus};
