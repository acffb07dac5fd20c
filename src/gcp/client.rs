//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication and
//! HTTP functionality. Implements [`ResourceApi`] by resolving the path
//! templates of the resource catalog against the active project and zone.

use super::auth::GcpCredentials;
use super::http::{ApiStatus, GcpHttpClient};
use crate::resource::fetcher::{fetch_all_pages, PaginatedResult};
use crate::resource::{ResourceApi, ResourceDef};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

/// Zone value selecting every zone through the aggregated APIs
pub const ALL_ZONES: &str = "all";

/// Base URLs of the REST APIs in use
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub compute: String,
    pub storage: String,
    pub container: String,
    pub iam: String,
    pub resourcemanager: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com/compute/v1".to_string(),
            storage: "https://storage.googleapis.com/storage/v1".to_string(),
            container: "https://container.googleapis.com/v1".to_string(),
            iam: "https://iam.googleapis.com/v1".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com/v1".to_string(),
        }
    }
}

impl Endpoints {
    /// Every service under `{base}/{service}`, e.g. a mock server
    pub fn uniform(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            compute: format!("{}/compute", base),
            storage: format!("{}/storage", base),
            container: format!("{}/container", base),
            iam: format!("{}/iam", base),
            resourcemanager: format!("{}/resourcemanager", base),
        }
    }

    fn base_for(&self, service: &str) -> Result<&str> {
        match service {
            "compute" => Ok(&self.compute),
            "storage" => Ok(&self.storage),
            "container" => Ok(&self.container),
            "iam" => Ok(&self.iam),
            "resourcemanager" => Ok(&self.resourcemanager),
            _ => Err(anyhow::anyhow!("Unknown service: {}", service)),
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
    pub zone: String,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(zone: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, Endpoints::default(), zone)
    }

    /// Create a client from explicit credentials and endpoints
    pub fn with_credentials(credentials: GcpCredentials, endpoints: Endpoints, zone: &str) -> Result<Self> {
        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            endpoints,
            zone: zone.to_string(),
        })
    }

    /// Make a GET request to a GCP API, retrying once with a fresh token on 401
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        match self.http.get(url, &token).await {
            Err(e) if ApiStatus::is(&e, StatusCode::UNAUTHORIZED) => {
                tracing::warn!("Access token rejected, refreshing");
                let token = self.credentials.refresh_token().await?;
                self.http.get(url, &token).await
            }
            result => result,
        }
    }

    /// Switch to a different zone
    pub fn switch_zone(&mut self, zone: &str) {
        self.zone = zone.to_string();
    }

    /// Get the region from the current zone
    pub fn get_region(&self) -> String {
        match self.zone.rsplit_once('-') {
            Some((region, _)) => region.to_string(),
            None => self.zone.clone(),
        }
    }

    /// Build the list URL of a resource class
    pub fn list_url(&self, def: &ResourceDef, project: &str, sub_ids: &[String]) -> Result<String> {
        let template = if self.zone == ALL_ZONES {
            match (&def.aggregated_path, def.list_path.contains("{zone}")) {
                (Some(aggregated), _) => aggregated.as_str(),
                (None, true) => anyhow::bail!("{} need a specific zone", def.display_name),
                (None, false) => def.list_path.as_str(),
            }
        } else {
            def.list_path.as_str()
        };

        let mut path = template.to_string();
        let mut query = Vec::new();
        for (name, value) in def.sub_params.iter().zip(sub_ids) {
            let placeholder = format!("{{{}}}", name);
            if path.contains(&placeholder) {
                path = path.replace(&placeholder, &urlencoding::encode(value));
            } else if !value.is_empty() {
                query.push(format!("{}={}", name, urlencoding::encode(value)));
            }
        }

        let path = self.fill_placeholders(&path, project);
        let url = format!("{}/{}", self.endpoints.base_for(&def.service)?, path);
        Ok(add_query(&url, &query))
    }

    /// Build the detail URL of one item
    pub fn detail_url(&self, def: &ResourceDef, project: &str, id: &str) -> Result<String> {
        let template = def
            .detail_path
            .as_deref()
            .with_context(|| format!("{} have no detail view", def.display_name))?;

        let path = template.replace("{id}", &urlencoding::encode(id));
        let path = self.fill_placeholders(&path, project);
        Ok(format!("{}/{}", self.endpoints.base_for(&def.service)?, path))
    }

    fn fill_placeholders(&self, path: &str, project: &str) -> String {
        path.replace("{project}", project)
            .replace("{zone}", &self.zone)
            .replace("{region}", &self.get_region())
            .replace("{location}", "-")
    }
}

impl ResourceApi for GcpClient {
    fn location(&self) -> &str {
        &self.zone
    }

    fn switch_location(&mut self, location: &str) {
        self.switch_zone(location);
    }

    async fn list(&self, def: &ResourceDef, scope: &str, sub_ids: &[String]) -> Result<Vec<Value>> {
        let url = self.list_url(def, scope, sub_ids)?;
        let aggregated = self.zone == ALL_ZONES && def.aggregated_path.is_some();

        fetch_all_pages(|page_token| {
            let url = match &page_token {
                Some(token) => add_query(&url, &[format!("pageToken={}", urlencoding::encode(token))]),
                None => url.clone(),
            };
            async move {
                let mut response = self.get(&url).await?;
                if aggregated {
                    response = flatten_aggregated_response(response);
                }
                anyhow::Ok(PaginatedResult::from_response(&response, def))
            }
        })
        .await
    }

    async fn describe(&self, def: &ResourceDef, scope: &str, id: &str) -> Result<Value> {
        let url = self.detail_url(def, scope, id)?;
        self.get(&url).await
    }
}

fn add_query(url: &str, params: &[String]) -> String {
    if params.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, params.join("&"))
    } else {
        format!("{}?{}", url, params.join("&"))
    }
}

/// Merge the per-zone buckets of an aggregated list into one `items` array,
/// keeping the page token
fn flatten_aggregated_response(response: Value) -> Value {
    let mut all_items: Vec<Value> = Vec::new();

    if let Some(scopes) = response.get("items").and_then(|v| v.as_object()) {
        for scope_data in scopes.values() {
            let Some(obj) = scope_data.as_object() else {
                continue;
            };
            for (key, value) in obj {
                // Skip warning field and other metadata
                if key == "warning" {
                    continue;
                }
                if let Some(arr) = value.as_array() {
                    all_items.extend(arr.iter().cloned());
                }
            }
        }
    }

    let mut flattened = serde_json::json!({ "items": all_items });
    if let Some(token) = response.get("nextPageToken") {
        flattened["nextPageToken"] = token.clone();
    }
    flattened
}
