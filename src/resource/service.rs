//! Resource Service
//!
//! Cache-aware access to resource listings. A listing is looked up under its
//! cache key first; on a miss the remote API is called and the result is
//! stored for the class's TTL. Failed list calls are never cached.

use super::fetcher::{extract_json_value, parse_timestamp};
use super::registry::{get_resource, ResourceDef};
use crate::cache::{class_prefix, resource_key, scope_prefix, CacheKey, CacheStore, Sweep, TtlPolicy};
use crate::enrich::{Detail, Enricher, Unavailable, UNKNOWN_STATUS};
use anyhow::{Context, Result};
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Longest time a detail batch with unreachable items stays cached
pub const DEGRADED_TTL: Duration = Duration::from_secs(30);

/// Remote operations the service memoizes
pub trait ResourceApi {
    /// Active zone, part of the cache key of zonal and regional listings
    fn location(&self) -> &str;

    fn switch_location(&mut self, location: &str);

    /// Enumerate a resource family
    fn list(
        &self,
        def: &ResourceDef,
        scope: &str,
        sub_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Value>>>;

    /// Fetch the detail record of one item
    fn describe(&self, def: &ResourceDef, scope: &str, id: &str) -> impl Future<Output = Result<Value>>;
}

/// A listed record joined with its detail call outcome
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedRecord {
    pub id: String,
    pub summary: Value,
    pub detail: Detail<Value>,
}

impl DetailedRecord {
    pub fn is_degraded(&self) -> bool {
        matches!(self.detail, Detail::Unavailable(_))
    }

    /// Field of the detail record, or the `UNKNOWN` marker when degraded
    pub fn detail_field(&self, path: &str) -> String {
        match &self.detail {
            Detail::Fetched(detail) => extract_json_value(detail, path),
            Detail::Unavailable(_) => UNKNOWN_STATUS.to_string(),
        }
    }
}

/// Hit/miss counters and entry counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Listing lookups, including the ones made on behalf of a detail miss
    pub hits: u64,
    pub misses: u64,
    /// Detail batch lookups
    pub detail_hits: u64,
    pub detail_misses: u64,
    pub list_entries: usize,
    pub detail_entries: usize,
}

impl CacheStats {
    /// Listing hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            (self.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// The stores behind a [`ResourceService`]
#[derive(Debug, Default)]
pub struct ResourceCaches {
    lists: CacheStore<Vec<Value>>,
    details: CacheStore<Vec<DetailedRecord>>,
}

impl ResourceCaches {
    fn delete(&self, key: &str) {
        self.lists.delete(key);
        self.details.delete(key);
    }

    fn delete_prefix(&self, prefix: &str) -> usize {
        self.lists.delete_prefix(prefix) + self.details.delete_prefix(prefix)
    }

    fn clear(&self) {
        self.lists.clear();
        self.details.clear();
    }
}

impl Sweep for ResourceCaches {
    fn sweep(&self) -> usize {
        self.lists.clean_expired() + self.details.clean_expired()
    }
}

/// Cache-aware listing over a [`ResourceApi`]
pub struct ResourceService<A> {
    api: A,
    caches: Arc<ResourceCaches>,
    policy: Arc<TtlPolicy>,
    enricher: Enricher,
    hits: AtomicU64,
    misses: AtomicU64,
    detail_hits: AtomicU64,
    detail_misses: AtomicU64,
}

impl<A: ResourceApi> ResourceService<A> {
    pub fn new(api: A, policy: Arc<TtlPolicy>, enricher: Enricher) -> Self {
        Self {
            api,
            caches: Arc::new(ResourceCaches::default()),
            policy,
            enricher,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            detail_hits: AtomicU64::new(0),
            detail_misses: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Mutable access to the API, e.g. to switch zone
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Shared handle on the stores, for the background sweeper
    pub fn caches(&self) -> Arc<ResourceCaches> {
        Arc::clone(&self.caches)
    }

    /// Cache key of a listing. Zonal and regional families also key on the
    /// active zone so switching zone never serves another zone's data.
    pub fn key_for(&self, def: &ResourceDef, scope: &str, class: &str, sub_ids: &[String]) -> CacheKey {
        if def.is_location_scoped() {
            let mut segments = Vec::with_capacity(sub_ids.len() + 1);
            segments.push(self.api.location());
            segments.extend(sub_ids.iter().map(String::as_str));
            resource_key(scope, class, segments.as_slice())
        } else {
            resource_key(scope, class, sub_ids)
        }
    }

    /// List a resource family, served from cache while fresh
    pub async fn list(&self, scope: &str, class: &str, sub_ids: &[String]) -> Result<Vec<Value>> {
        let def = lookup(class)?;
        let key = self.key_for(def, scope, class, sub_ids);

        if let Some(items) = self.caches.lists.get(key.as_str()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit: {}", key);
            return Ok(items);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Cache miss: {}", key);

        let items = self
            .api
            .list(def, scope, sub_ids)
            .await
            .with_context(|| format!("Failed to list {} in {}", def.display_name, scope))?;

        let ttl = self.policy.ttl_for(class);
        tracing::info!(
            "Listed {} {} in {}, caching for {}s",
            items.len(),
            class,
            scope,
            ttl.as_secs()
        );
        self.caches.lists.set(key, items.clone(), ttl);
        Ok(items)
    }

    /// List a family and fetch every item's detail record, newest first.
    ///
    /// Every listed item yields exactly one record. Items whose detail call
    /// fails, or that carry no id, stay in the result as degraded records.
    /// Items sharing an id share one detail call.
    pub async fn list_detailed(
        &self,
        scope: &str,
        class: &str,
        sub_ids: &[String],
    ) -> Result<Vec<DetailedRecord>> {
        let def = lookup(class)?;
        if !def.has_detail() {
            anyhow::bail!("{} have no detail view", def.display_name);
        }
        let key = self.key_for(def, scope, class, sub_ids);

        if let Some(records) = self.caches.details.get(key.as_str()) {
            self.detail_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit (details): {}", key);
            return Ok(records);
        }
        self.detail_misses.fetch_add(1, Ordering::Relaxed);

        let summaries = self.list(scope, class, sub_ids).await?;

        let mut records = Vec::with_capacity(summaries.len());
        let mut by_id: HashMap<String, Vec<Value>> = HashMap::new();
        for item in summaries {
            match record_id(&item, &def.id_field) {
                Some(id) => by_id.entry(id).or_default().push(item),
                None => {
                    tracing::warn!("{} record without {}, skipping detail call", class, def.id_field);
                    records.push(DetailedRecord {
                        id: extract_json_value(&item, &def.id_field),
                        summary: item,
                        detail: Detail::Unavailable(Unavailable::Failed(format!(
                            "missing {}",
                            def.id_field
                        ))),
                    });
                }
            }
        }

        let api = &self.api;
        let enriched = self
            .enricher
            .run(by_id.keys().cloned(), |id| async move {
                api.describe(def, scope, &id).await
            })
            .await;

        for result in enriched {
            let items = by_id.remove(&result.id).unwrap_or_default();
            records.extend(items.into_iter().map(|summary| DetailedRecord {
                id: result.id.clone(),
                summary,
                detail: result.detail.clone(),
            }));
        }

        if let Some(field) = def.timestamp_field.as_deref() {
            sort_newest_first(&mut records, field);
        } else {
            records.sort_by(|a, b| a.id.cmp(&b.id));
        }

        let mut ttl = self.policy.ttl_for(class);
        if records.iter().any(DetailedRecord::is_degraded) {
            ttl = ttl.min(DEGRADED_TTL);
        }
        self.caches.details.set(key, records.clone(), ttl);

        Ok(records)
    }

    /// Drop one cached listing (and its details)
    pub fn invalidate(&self, scope: &str, class: &str, sub_ids: &[String]) -> Result<()> {
        let def = lookup(class)?;
        let key = self.key_for(def, scope, class, sub_ids);
        self.caches.delete(key.as_str());
        Ok(())
    }

    /// Drop every cached listing of one family in one scope
    pub fn invalidate_class(&self, scope: &str, class: &str) -> usize {
        self.caches.delete_prefix(&class_prefix(scope, class))
    }

    /// Drop everything cached for one scope
    pub fn invalidate_scope(&self, scope: &str) -> usize {
        self.caches.delete_prefix(&scope_prefix(scope))
    }

    pub fn clear(&self) {
        self.caches.clear();
    }

    /// Time since a listing was fetched, if it is cached
    pub fn age(&self, scope: &str, class: &str, sub_ids: &[String]) -> Option<Duration> {
        let def = get_resource(class)?;
        let key = self.key_for(def, scope, class, sub_ids);
        self.caches.lists.age(key.as_str())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            detail_hits: self.detail_hits.load(Ordering::Relaxed),
            detail_misses: self.detail_misses.load(Ordering::Relaxed),
            list_entries: self.caches.lists.len(),
            detail_entries: self.caches.details.len(),
        }
    }
}

/// Id of a listed record, if it has a usable one
fn record_id(item: &Value, field: &str) -> Option<String> {
    let id = extract_json_value(item, field);
    (!id.is_empty() && id != "-").then_some(id)
}

fn lookup(class: &str) -> Result<&'static ResourceDef> {
    get_resource(class).with_context(|| format!("Unknown resource: {}", class))
}

/// Newest first by an RFC 3339 field; records without one go last, by id
fn sort_newest_first(records: &mut [DetailedRecord], field: &str) {
    records.sort_by(|a, b| {
        match (
            parse_timestamp(&a.summary, field),
            parse_timestamp(&b.summary, field),
        ) {
            (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => CmpOrdering::Less,
            (None, Some(_)) => CmpOrdering::Greater,
            (None, None) => a.id.cmp(&b.id),
        }
    });
}
