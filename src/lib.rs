//! Memoizing access layer for Google Cloud resource listings.
//!
//! Listings are cached per (project, resource class, sub-resource ids) with a
//! per-class TTL, and per-item detail calls are fanned out under a bounded
//! concurrency gate. See [`resource::ResourceService`] for the entry point.

pub mod app;
pub mod cache;
pub mod command;
pub mod config;
pub mod enrich;
pub mod gcp;
pub mod resource;

/// Version injected at compile time via TGCP_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TGCP_VERSION") {
    Some(v) => v,
    None => "dev",
};
