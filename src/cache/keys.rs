//! Cache key namespace
//!
//! Keys are built from an identity scope (the active project), a resource
//! class tag and optional sub-resource identifiers. Every segment is
//! terminated by [`DELIMITER`], so `scope:` prefixes every key of the scope
//! and `scope:class:` prefixes every key of that resource family without
//! matching a sibling family such as `scope:class-other:`.
//!
//! Identifiers must not contain the delimiter. This is not checked.

use std::fmt;

/// Segment delimiter
pub const DELIMITER: char = ':';

/// A cache key derived from (scope, class, sub-ids)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

fn push_segment(buf: &mut String, segment: &str) {
    buf.push_str(segment);
    buf.push(DELIMITER);
}

/// Key for a resource family, optionally narrowed by sub-resource identifiers
/// (bucket + object prefix, cluster + location, ...)
pub fn resource_key<S: AsRef<str>>(scope: &str, class: &str, sub_ids: &[S]) -> CacheKey {
    let mut key = class_prefix(scope, class);
    for id in sub_ids {
        push_segment(&mut key, id.as_ref());
    }
    CacheKey(key)
}

/// Prefix of every key under one identity scope
pub fn scope_prefix(scope: &str) -> String {
    let mut prefix = String::with_capacity(scope.len() + 1);
    push_segment(&mut prefix, scope);
    prefix
}

/// Prefix of every key of one resource family under one identity scope
pub fn class_prefix(scope: &str, class: &str) -> String {
    let mut prefix = scope_prefix(scope);
    push_segment(&mut prefix, class);
    prefix
}
