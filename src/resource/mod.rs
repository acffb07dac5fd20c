//! Resource abstraction layer
//!
//! Resource classes are described by an embedded JSON catalog; listings go
//! through [`ResourceService`], which memoizes them in the resource cache and
//! fans detail calls out through the [`Enricher`](crate::enrich::Enricher).
//!
//! # Architecture
//!
//! - [`registry`] - Loads resource class definitions from embedded JSON
//! - [`fetcher`] - Pagination and record extraction
//! - [`service`] - Cache-aware listing and detail enrichment
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tgcp_cache::cache::TtlPolicy;
//! use tgcp_cache::enrich::Enricher;
//! use tgcp_cache::resource::ResourceService;
//!
//! async fn list_buckets(client: GcpClient) -> anyhow::Result<()> {
//!     let service = ResourceService::new(client, Arc::new(TtlPolicy::builtin()), Enricher::default());
//!     let buckets = service.list("my-project", "buckets", &[]).await?;
//!     // Served from cache for the next ten minutes
//!     let again = service.list("my-project", "buckets", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod fetcher;
mod registry;
mod service;

pub use fetcher::{extract_json_value, extract_short_name};
pub use registry::*;
pub use service::{
    CacheStats, DetailedRecord, ResourceApi, ResourceCaches, ResourceService, DEGRADED_TTL,
};
