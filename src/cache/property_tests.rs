//! Property-based tests for the cache module.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    CacheKey, CacheStore, CachedValue, EntityKind, MemoryBackend, Scope, ScopedCache,
    MAX_KEY_LENGTH,
};

const TEST_MAX_ENTRIES: usize = 16;
const LONG_TTL: Duration = Duration::from_secs(3600);

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2}_[a-z][0-9]{1,3}"
}

fn value_strategy() -> impl Strategy<Value = CachedValue> {
    prop_oneof![
        any::<i64>().prop_map(CachedValue::Int),
        prop::collection::vec(any::<i64>(), 0..20).prop_map(CachedValue::IntList),
    ]
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, value: CachedValue },
    Get { key: String },
    Delete { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| StoreOp::Set { key, value }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
        key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

fn kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![Just(EntityKind::Profile), Just(EntityKind::Event)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity is never exceeded and the reported entry count tracks the store.
    #[test]
    fn prop_store_respects_capacity(ops in prop::collection::vec(store_op_strategy(), 1..80)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    prop_assert!(store.set(&key, value, LONG_TTL).is_ok());
                }
                StoreOp::Get { key } => {
                    let _ = store.get(&key);
                }
                StoreOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }
            prop_assert!(store.len() <= TEST_MAX_ENTRIES);
        }

        prop_assert_eq!(store.stats().total_entries, store.len());
    }

    // Without eviction pressure, the last write to each key is what a read returns.
    #[test]
    fn prop_last_write_wins(writes in prop::collection::vec((key_strategy(), value_strategy()), 1..40)) {
        let mut store = CacheStore::new(1000);
        let mut model: HashMap<String, CachedValue> = HashMap::new();

        for (key, value) in writes {
            store.set(&key, value.clone(), LONG_TTL).unwrap();
            model.insert(key, value);
        }

        for (key, expected) in model {
            prop_assert_eq!(store.get(&key), Some(expected));
        }
    }

    // The most recently written keys survive eviction.
    #[test]
    fn prop_lru_keeps_newest(count in 1usize..60) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        for i in 0..count {
            store.set(&format!("k{i}"), CachedValue::Int(i as i64), LONG_TTL).unwrap();
        }

        let kept = count.min(TEST_MAX_ENTRIES);
        prop_assert_eq!(store.len(), kept);
        for i in (count - kept)..count {
            prop_assert_eq!(store.get(&format!("k{i}")), Some(CachedValue::Int(i as i64)));
        }
    }

    // Keys over the length limit are refused and leave the store untouched.
    #[test]
    fn prop_oversized_keys_rejected(extra in 1usize..64) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        let key = "x".repeat(MAX_KEY_LENGTH + extra);

        prop_assert!(store.set(&key, CachedValue::Int(1), LONG_TTL).is_err());
        prop_assert!(store.is_empty());
    }

    // Purging an entity leaves nothing behind in any of its scopes and
    // never touches another id.
    #[test]
    fn prop_purge_clears_every_scope(kind in kind_strategy(), id in 1i64..10_000, count in any::<i64>()) {
        tokio_test::block_on(async {
            let cache = ScopedCache::new(Arc::new(MemoryBackend::new(100)));
            let neighbour = id + 1;

            for target in [id, neighbour] {
                cache.set_int(&CacheKey::scoped(kind, Scope::Detail, target), count, LONG_TTL).await;
                cache.set_int(&CacheKey::scoped(kind, Scope::Summary, target), count, LONG_TTL).await;
                cache.set_ids(&CacheKey::scoped(kind, Scope::RelatedIds, target), &[count], LONG_TTL).await;
            }

            cache.purge(kind, id).await;

            for scope in Scope::ALL {
                prop_assert_eq!(cache.get_int(&CacheKey::scoped(kind, scope, id)).await, None);
                prop_assert_eq!(cache.get_ids(&CacheKey::scoped(kind, scope, id)).await, None);
            }
            prop_assert_eq!(
                cache.get_int(&CacheKey::scoped(kind, Scope::Detail, neighbour)).await,
                Some(count)
            );
            Ok(())
        })?;
    }
}
