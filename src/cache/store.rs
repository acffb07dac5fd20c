//! Cache Store
//!
//! Thread-safe TTL key/value store. Every entry carries an expiration instant
//! and the instant it was last written. Expired entries are treated as absent
//! by reads (lazy expiry) and are reclaimed by [`CacheStore::clean_expired`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A stored value with its bookkeeping timestamps
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
    updated_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory TTL cache
///
/// Readers (`get`, `len`, `age`) share the lock; every mutation takes it
/// exclusively. Values are cloned out, callers never hold a reference into
/// the map.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> CacheStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // Store operations cannot fail, so a panic in another holder of the lock
    // must not poison every later call.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key`, expiring `ttl` from now. Replaces any existing entry.
    pub fn set(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
            updated_at: now,
        };
        self.write().insert(key.into(), entry);
    }

    /// Get a live value. Expired entries are a miss even before they are swept.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Remove a single key
    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    /// Remove every key starting with `prefix`, returning how many were dropped
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Cache: dropped {} entries under prefix {:?}", removed, prefix);
        }
        removed
    }

    /// Remove everything
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Drop expired entries, returning how many were reclaimed
    pub fn clean_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of entries held, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Time since the last `set` of a live entry
    pub fn age(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| now.duration_since(entry.updated_at))
    }
}

impl<T: Clone> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
