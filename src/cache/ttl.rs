//! TTL Policy Table
//!
//! Maps each resource class to how long its listing stays cached. Built once
//! at startup (built-in defaults plus user overrides from the config file)
//! and shared read-only afterwards. The store itself is TTL-agnostic.

use std::collections::HashMap;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// TTL for classes missing from the table
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * MINUTE);

/// Built-in TTLs, in seconds.
///
/// Identity-level facts change rarely and are cheap to keep. Instances and
/// object listings churn constantly and stay fresh only briefly.
const BUILTIN_TTLS: &[(&str, u64)] = &[
    // Identity / account
    ("projects", HOUR),
    ("zones", HOUR),
    ("regions", HOUR),
    ("iam-service-accounts", 10 * MINUTE),
    // Storage
    ("buckets", 10 * MINUTE),
    ("objects", 2 * MINUTE),
    // Compute
    ("compute-instances", 30),
    ("compute-disks", 2 * MINUTE),
    ("compute-snapshots", 5 * MINUTE),
    ("compute-images", 30 * MINUTE),
    // Networking
    ("networks", 10 * MINUTE),
    ("subnetworks", 10 * MINUTE),
    ("firewalls", 5 * MINUTE),
    // GKE
    ("gke-clusters", 2 * MINUTE),
    ("gke-nodepools", 2 * MINUTE),
];

/// Immutable resource class -> TTL lookup
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    table: HashMap<String, Duration>,
    fallback: Duration,
}

impl TtlPolicy {
    /// Policy with the built-in table only
    pub fn builtin() -> Self {
        let table = BUILTIN_TTLS
            .iter()
            .map(|(class, secs)| (class.to_string(), Duration::from_secs(*secs)))
            .collect();

        Self {
            table,
            fallback: DEFAULT_TTL,
        }
    }

    /// Built-in table with per-class overrides in seconds
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a u64)>,
    {
        let mut policy = Self::builtin();
        for (class, secs) in overrides {
            tracing::debug!("TTL override: {} = {}s", class, secs);
            policy
                .table
                .insert(class.clone(), Duration::from_secs(*secs));
        }
        policy
    }

    /// Configured TTL for a class, if it has one
    pub fn get(&self, class: &str) -> Option<Duration> {
        self.table.get(class).copied()
    }

    /// TTL for a class, falling back to [`DEFAULT_TTL`]
    pub fn ttl_for(&self, class: &str) -> Duration {
        self.get(class).unwrap_or(self.fallback)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}
