//! Configuration Management
//!
//! Handles persistent configuration storage for tgcp-cache.

use crate::cache::{TtlPolicy, DEFAULT_SWEEP_INTERVAL};
use crate::enrich::{Enricher, DEFAULT_CONCURRENCY};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cache tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Per resource class TTL overrides, in seconds
    pub ttl_overrides: HashMap<String, u64>,
    /// Maximum detail fetches in flight per batch
    pub enrich_concurrency: usize,
    /// Deadline for a single detail fetch
    pub fetch_timeout_secs: Option<u64>,
    /// Period of the expired-entry sweep
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_overrides: HashMap::new(),
            enrich_concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout_secs: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl CacheSettings {
    /// TTL table with the configured overrides applied
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::with_overrides(&self.ttl_overrides)
    }

    pub fn enricher(&self) -> Enricher {
        let enricher = Enricher::new(self.enrich_concurrency);
        match self.fetch_timeout_secs {
            Some(secs) => enricher.with_fetch_timeout(Duration::from_secs(secs)),
            None => enricher,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Last used zone
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tgcp").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective project (config > gcloud default); CLI flags take precedence upstream
    pub fn effective_project(&self) -> String {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
            .unwrap_or_default()
    }

    /// Get effective zone (config > gcloud default)
    pub fn effective_zone(&self) -> String {
        self.zone
            .clone()
            .or_else(crate::gcp::auth::get_default_zone)
            .unwrap_or_else(|| "us-central1-a".to_string())
    }
}
