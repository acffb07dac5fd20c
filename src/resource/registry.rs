//! Resource Registry - Load resource class definitions from JSON
//!
//! The catalog of listable resource classes is embedded in the binary and
//! parsed once on first access.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource catalog (compiled into the binary)
const CATALOG: &str = include_str!("../resources/catalog.json");

/// Resource class definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    /// API family: compute, storage, container, iam, resourcemanager
    pub service: String,
    /// Path template relative to the service base URL
    pub list_path: String,
    /// Path template listing every zone at once, used when the zone is `all`
    #[serde(default)]
    pub aggregated_path: Option<String>,
    pub response_path: String,
    pub id_field: String,
    pub name_field: String,
    #[serde(default)]
    pub status_field: Option<String>,
    /// RFC 3339 field used to order records newest first
    #[serde(default)]
    pub timestamp_field: Option<String>,
    /// Path template of the per-item detail call, `{id}` being the item id
    #[serde(default)]
    pub detail_path: Option<String>,
    /// Names bound, in order, to the sub-resource identifiers of a listing
    #[serde(default)]
    pub sub_params: Vec<String>,
}

impl ResourceDef {
    /// Whether listings depend on the active zone or region
    pub fn is_location_scoped(&self) -> bool {
        self.list_path.contains("{zone}")
            || self.list_path.contains("{region}")
            || self.aggregated_path.is_some()
    }

    pub fn has_detail(&self) -> bool {
        self.detail_path.is_some()
    }
}

/// Root structure of resources/catalog.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| match serde_json::from_str(CATALOG) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse embedded resource catalog: {}", e);
            ResourceConfig {
                resources: HashMap::new(),
            }
        }
    })
}

/// Get a resource definition by class tag
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all resource class tags, sorted (for autocomplete)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}
