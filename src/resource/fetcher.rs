//! Resource Fetcher
//!
//! Pagination and record extraction shared by every list call.

use super::registry::ResourceDef;
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::future::Future;

/// Upper bound on pages followed for one listing
const MAX_PAGES: usize = 100;

/// One page of a listing
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

impl PaginatedResult {
    /// Split a raw API response into its items and next page token
    pub fn from_response(response: &Value, resource_def: &ResourceDef) -> Self {
        let items = extract_items(response, &resource_def.response_path);
        let next_token = response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Self { items, next_token }
    }
}

/// Fetch all pages (auto-paginate)
pub async fn fetch_all_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Value>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PaginatedResult>>,
{
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let result = fetch_page(page_token.take()).await?;
        all_items.extend(result.items);

        match result.next_token {
            Some(token) => page_token = Some(token),
            None => return Ok(all_items),
        }
    }

    tracing::warn!(
        "Stopped after {} pages, listing truncated at {} items",
        MAX_PAGES,
        all_items.len()
    );
    Ok(all_items)
}

/// Extract items from a response using a dot-separated response path
pub fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    let raw_items = if path.is_empty() {
        response.as_array().cloned().unwrap_or_default()
    } else {
        let mut current = response;
        for part in path.split('.') {
            current = match current.get(part) {
                Some(v) => v,
                None => return vec![],
            };
        }
        current.as_array().cloned().unwrap_or_default()
    };

    raw_items.into_iter().map(post_process_item).collect()
}

/// Add `*_short` companions for fields holding full resource URLs
fn post_process_item(mut item: Value) -> Value {
    if let Value::Object(ref mut map) = item {
        for field in ["zone", "region", "machineType", "network", "type"] {
            if let Some(url) = map.get(field).and_then(|v| v.as_str()) {
                if url.contains('/') {
                    let short = extract_short_name(url);
                    map.insert(format!("{}_short", field), Value::String(short));
                }
            }
        }
    }
    item
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let mut current = item;

    for part in path.split('.') {
        let next = match part.parse::<usize>() {
            Ok(idx) => current.get(idx),
            Err(_) => current.get(part),
        };
        current = match next {
            Some(v) => v,
            None => return "-".to_string(),
        };
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => "[object]".to_string(),
    }
}

/// Parse an RFC 3339 timestamp field of a record
pub fn parse_timestamp(item: &Value, field: &str) -> Option<DateTime<FixedOffset>> {
    item.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_items_nested_path() {
        let response = json!({"data": {"rows": [{"name": "a"}, {"name": "b"}]}});
        let items = extract_items(&response, "data.rows");
        assert_eq!(items.len(), 2);
        assert!(extract_items(&response, "data.missing").is_empty());
    }

    #[test]
    fn test_short_names_added() {
        let items = extract_items(
            &json!({"items": [{
                "name": "vm-1",
                "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
                "machineType": "zones/us-central1-a/machineTypes/e2-medium"
            }]}),
            "items",
        );
        assert_eq!(items[0]["zone_short"], "us-central1-a");
        assert_eq!(items[0]["machineType_short"], "e2-medium");
    }

    #[test]
    fn test_extract_json_value_paths() {
        let item = json!({"name": "vm", "disks": [{"sizeGb": 10}], "labels": {}, "gone": null});
        assert_eq!(extract_json_value(&item, "name"), "vm");
        assert_eq!(extract_json_value(&item, "disks.0.sizeGb"), "10");
        assert_eq!(extract_json_value(&item, "disks"), "[1 items]");
        assert_eq!(extract_json_value(&item, "labels"), "[object]");
        assert_eq!(extract_json_value(&item, "gone"), "-");
        assert_eq!(extract_json_value(&item, "missing.path"), "-");
    }

    #[test]
    fn test_parse_timestamp() {
        let item = json!({"timeCreated": "2024-03-01T10:30:00.000Z", "bad": "yesterday"});
        assert!(parse_timestamp(&item, "timeCreated").is_some());
        assert!(parse_timestamp(&item, "bad").is_none());
        assert!(parse_timestamp(&item, "missing").is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_pages_follows_tokens() {
        let items = fetch_all_pages(|token| async move {
            let page = match token.as_deref() {
                None => PaginatedResult {
                    items: vec![json!(1), json!(2)],
                    next_token: Some("p2".to_string()),
                },
                Some("p2") => PaginatedResult {
                    items: vec![json!(3)],
                    next_token: None,
                },
                Some(other) => anyhow::bail!("unexpected token {}", other),
            };
            Ok(page)
        })
        .await
        .unwrap();

        assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_fetch_all_pages_propagates_errors() {
        let result = fetch_all_pages(|_| async {
            Err::<PaginatedResult, _>(anyhow::anyhow!("API request failed: 403 Forbidden"))
        })
        .await;
        assert!(result.is_err());
    }
}
