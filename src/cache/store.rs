//! Cache Store Module
//!
//! In-memory storage engine behind `MemoryBackend`: a HashMap of entries with
//! LRU capacity eviction and TTL expiry.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::backend::BackendError;
use crate::cache::{CacheEntry, CachedValue, LruTracker, StoreStats, MAX_KEY_LENGTH};

// == Cache Store ==
/// Key-value storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Storage statistics
    stats: StoreStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: StoreStats::new(),
            max_entries,
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its TTL.
    ///
    /// If the store is at capacity, the least recently used entry is evicted.
    pub fn set(
        &mut self,
        key: &str,
        value: CachedValue,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(BackendError::KeyTooLong(key.len()));
        }

        if self.max_entries == 0 {
            return Err(BackendError::Full);
        }

        let is_overwrite = self.entries.contains_key(key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            match self.lru.evict_oldest() {
                Some(evicted_key) => {
                    self.entries.remove(&evicted_key);
                    self.stats.record_eviction();
                }
                None => return Err(BackendError::Full),
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed on the way and read as absent.
    pub fn get(&mut self, key: &str) -> Option<CachedValue> {
        let expired = self.entries.get(key)?.is_expired();

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Stats ==
    /// Returns current storage statistics.
    pub fn stats(&self) -> StoreStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_expirations(expired_keys.len());
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100);

        store.set("pf_s1", CachedValue::Int(11), HOUR).unwrap();

        assert_eq!(store.get("pf_s1"), Some(CachedValue::Int(11)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(100);
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(100);

        store.set("ev_c3", CachedValue::Int(4), HOUR).unwrap();

        assert!(store.delete("ev_c3"));
        assert!(!store.delete("ev_c3"));
        assert!(store.is_empty());
        assert_eq!(store.get("ev_c3"), None);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100);

        store.set("ev_p3", CachedValue::IntList(vec![1]), HOUR).unwrap();
        store.set("ev_p3", CachedValue::IntList(vec![1, 2]), HOUR).unwrap();

        assert_eq!(store.get("ev_p3"), Some(CachedValue::IntList(vec![1, 2])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100);

        store
            .set("short", CachedValue::Int(1), Duration::from_millis(200))
            .unwrap();
        assert!(store.get("short").is_some());

        sleep(Duration::from_millis(250));

        assert_eq!(store.get("short"), None);
        assert_eq!(store.stats().expirations, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3);

        store.set("k1", CachedValue::Int(1), HOUR).unwrap();
        store.set("k2", CachedValue::Int(2), HOUR).unwrap();
        store.set("k3", CachedValue::Int(3), HOUR).unwrap();

        // Reading k1 makes k2 the oldest
        store.get("k1");
        store.set("k4", CachedValue::Int(4), HOUR).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("k2"), None);
        assert!(store.get("k1").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(100);

        store
            .set("soon", CachedValue::Int(1), Duration::from_millis(200))
            .unwrap();
        store.set("later", CachedValue::Int(2), HOUR).unwrap();

        sleep(Duration::from_millis(250));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("later").is_some());
    }

    #[test]
    fn test_store_key_too_long() {
        let mut store = CacheStore::new(100);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(&long_key, CachedValue::Int(1), HOUR);
        assert!(matches!(result, Err(BackendError::KeyTooLong(_))));
    }

    #[test]
    fn test_store_zero_capacity_is_full() {
        let mut store = CacheStore::new(0);

        let result = store.set("k", CachedValue::Int(1), HOUR);
        assert!(matches!(result, Err(BackendError::Full)));
    }
}
