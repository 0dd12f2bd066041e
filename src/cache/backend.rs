//! Cache Backends
//!
//! `CacheBackend` is the seam between `ScopedCache` and whatever actually holds
//! the bytes. Backends own TTL expiry; callers never evict.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::{CacheStore, CachedValue, StoreStats};

// == Backend Error ==
/// Failures raised by a backend. `ScopedCache` absorbs all of them.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Key exceeds the backend's key length limit
    #[error("key of {0} bytes exceeds the maximum length")]
    KeyTooLong(usize),

    /// No room for a new entry and nothing could be evicted
    #[error("cache is full")]
    Full,

    /// Backing service could not be reached or rejected the command
    #[error("backing service unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes were not a valid envelope
    #[error("could not decode cached value: {0}")]
    Codec(#[from] serde_json::Error),
}

// == Cache Backend ==
/// Storage behind a `ScopedCache`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Reads a live value.
    async fn get(&self, key: &str) -> Result<Option<CachedValue>, BackendError>;

    /// Writes a value that expires `ttl` after now.
    async fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<(), BackendError>;

    /// Deletes a key; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Storage metrics, for backends that can report them.
    async fn stats(&self) -> Option<StoreStats> {
        None
    }
}

// == Memory Backend ==
/// In-process backend over a `CacheStore`.
///
/// `get` takes the write lock because reads refresh LRU order and may drop
/// expired entries.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<CacheStore>>,
}

impl MemoryBackend {
    /// Creates a backend holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(max_entries))),
        }
    }

    /// Removes expired entries now. Used by the background sweep.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>, BackendError> {
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<(), BackendError> {
        self.store.write().await.set(key, value, ttl)
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.store.write().await.delete(key);
        Ok(())
    }

    async fn stats(&self) -> Option<StoreStats> {
        Some(self.store.read().await.stats())
    }
}
