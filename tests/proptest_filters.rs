//! Property-based tests using proptest
//!
//! These tests verify cache key derivation, prefix invalidation and the
//! completeness of detail enrichment using randomized inputs.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tgcp_cache::cache::{class_prefix, resource_key, scope_prefix, CacheStore};
use tgcp_cache::enrich::Enricher;

/// Identifier segments as they appear in GCP names (no delimiter)
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}"
}

fn arb_sub_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_segment(), 0..4)
}

const TTL: Duration = Duration::from_secs(600);

proptest! {
    /// Same inputs always produce the same key
    #[test]
    fn key_is_deterministic(scope in arb_segment(), class in arb_segment(), subs in arb_sub_ids()) {
        prop_assert_eq!(
            resource_key(&scope, &class, &subs),
            resource_key(&scope, &class, &subs)
        );
    }

    /// Distinct inputs never share a key
    #[test]
    fn distinct_inputs_distinct_keys(
        a in (arb_segment(), arb_segment(), arb_sub_ids()),
        b in (arb_segment(), arb_segment(), arb_sub_ids()),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(
            resource_key(&a.0, &a.1, &a.2),
            resource_key(&b.0, &b.1, &b.2)
        );
    }

    /// Every key starts with its scope and class prefixes, and only with
    /// the prefixes of its own scope
    #[test]
    fn prefixes_cover_their_keys(
        scope in arb_segment(),
        other in arb_segment(),
        class in arb_segment(),
        subs in arb_sub_ids(),
    ) {
        let key = resource_key(&scope, &class, &subs);
        prop_assert!(key.as_str().starts_with(&scope_prefix(&scope)));
        prop_assert!(key.as_str().starts_with(&class_prefix(&scope, &class)));
        if other != scope {
            prop_assert!(!key.as_str().starts_with(&scope_prefix(&other)));
        }
    }

    /// Prefix deletion removes exactly the keys of one scope
    #[test]
    fn delete_prefix_is_scoped(
        entries in prop::collection::vec((prop_oneof!["alpha", "beta", "alphabet"], arb_segment(), arb_sub_ids()), 1..30),
    ) {
        let store = CacheStore::new();
        let mut keys = HashSet::new();
        for (scope, class, subs) in &entries {
            let key = resource_key(scope, class, subs);
            keys.insert((scope.clone(), key.clone()));
            store.set(key, 1u32, TTL);
        }

        let expected: usize = keys.iter().filter(|(scope, _)| scope == "alpha").count();
        prop_assert_eq!(store.delete_prefix(&scope_prefix("alpha")), expected);

        for (scope, key) in &keys {
            prop_assert_eq!(store.get(key.as_str()).is_some(), scope != "alpha");
        }
    }

    /// The last write to a key wins
    #[test]
    fn overwrite_keeps_latest(values in prop::collection::vec(any::<u32>(), 1..10)) {
        let store = CacheStore::new();
        for value in &values {
            store.set("p:buckets:", *value, TTL);
        }
        prop_assert_eq!(store.get("p:buckets:"), values.last().copied());
        prop_assert_eq!(store.len(), 1);
    }

    /// Every id gets exactly one outcome, whatever the concurrency
    #[test]
    fn enrichment_is_complete(
        ids in prop::collection::hash_set(arb_segment(), 0..40),
        concurrency in 0usize..16,
    ) {
        let enricher = Enricher::new(concurrency);
        let results = tokio_test::block_on(enricher.run(ids.iter().cloned(), |id| async move {
            if id.len() % 3 == 0 {
                anyhow::bail!("unreachable {}", id);
            }
            anyhow::Ok(id.len())
        }));

        prop_assert_eq!(results.len(), ids.len());
        let seen: HashSet<String> = results.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(&seen, &ids);
        for result in &results {
            prop_assert_eq!(result.is_degraded(), result.id.len() % 3 == 0);
        }
    }
}
