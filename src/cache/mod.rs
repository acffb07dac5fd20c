//! Resource cache
//!
//! Process-local memoization of remote listings.
//!
//! # Module Structure
//!
//! - [`store`] - TTL key/value store with lazy expiry and prefix invalidation
//! - [`keys`] - Deterministic keys and prefixes from (scope, class, sub-ids)
//! - [`ttl`] - Per resource class TTL policy
//! - [`sweep`] - Background task reclaiming expired entries
//!
//! # Example
//!
//! ```ignore
//! use tgcp_cache::cache::{resource_key, scope_prefix, CacheStore, TtlPolicy};
//!
//! let store = CacheStore::new();
//! let policy = TtlPolicy::builtin();
//! let key = resource_key::<&str>("my-project", "buckets", &[]);
//!
//! store.set(key.clone(), vec!["logs".to_string()], policy.ttl_for("buckets"));
//! let buckets = store.get(key.as_str());
//!
//! // Drop everything cached for the project
//! store.delete_prefix(&scope_prefix("my-project"));
//! ```

pub mod keys;
pub mod store;
pub mod sweep;
pub mod ttl;

pub use keys::{class_prefix, resource_key, scope_prefix, CacheKey};
pub use store::CacheStore;
pub use sweep::{spawn_sweeper, Sweep, DEFAULT_SWEEP_INTERVAL};
pub use ttl::{TtlPolicy, DEFAULT_TTL};
