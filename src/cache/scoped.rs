//! Scoped Cache
//!
//! Typed, fail-open facade over a `CacheBackend`. Constructed once at start-up
//! and cloned into every component that needs it; clones share the backend,
//! the key registry and the counters.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::backend::CacheBackend;
use crate::cache::keys::{CacheKey, EntityKind, KeyTemplates, Scope};
use crate::cache::stats::{CacheCounters, ScopedCacheStats};
use crate::cache::{CacheRecord, CachedValue, StoreStats};

// == Scoped Cache ==
/// Process-wide cache addressed by (kind, scope, id) or special keys.
///
/// The cache never returns an error: backend failures are logged, counted and
/// reported as a miss (reads) or ignored (writes and purges). It does not know
/// about tenants; callers check ownership of what they read.
#[derive(Clone)]
pub struct ScopedCache {
    backend: Arc<dyn CacheBackend>,
    templates: Arc<KeyTemplates>,
    counters: Arc<CacheCounters>,
}

impl ScopedCache {
    // == Constructors ==
    /// Creates a cache over `backend` using the default key templates.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_templates(backend, KeyTemplates::default())
    }

    pub fn with_templates(backend: Arc<dyn CacheBackend>, templates: KeyTemplates) -> Self {
        Self {
            backend,
            templates: Arc::new(templates),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    // == Typed Reads ==
    /// Reads a record of type `T`; any other stored shape is a miss.
    pub async fn get_record<T: CacheRecord>(&self, key: &CacheKey) -> Option<T> {
        let value = self.read(key).await?;
        let shape = value.shape().to_string();
        match value.into_record::<T>() {
            Some(record) => self.hit(record),
            None => self.mismatch(key, &shape, T::SCHEMA),
        }
    }

    /// Reads an integer counter.
    pub async fn get_int(&self, key: &CacheKey) -> Option<i64> {
        let value = self.read(key).await?;
        match value.as_int() {
            Some(v) => self.hit(v),
            None => self.mismatch(key, value.shape(), "int"),
        }
    }

    /// Reads a list of identifiers.
    pub async fn get_ids(&self, key: &CacheKey) -> Option<Vec<i64>> {
        let value = self.read(key).await?;
        let shape = value.shape().to_string();
        match value.into_ids() {
            Some(ids) => self.hit(ids),
            None => self.mismatch(key, &shape, "int_list"),
        }
    }

    // == Typed Writes ==
    /// Writes a record, overwriting whatever the key held.
    pub async fn set_record<T: CacheRecord>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        match CachedValue::record(value) {
            Ok(envelope) => self.write(key, envelope, ttl).await,
            Err(e) => {
                self.counters.backend_error();
                warn!(%key, error = %e, "could not encode record for cache");
            }
        }
    }

    pub async fn set_int(&self, key: &CacheKey, value: i64, ttl: Duration) {
        self.write(key, CachedValue::Int(value), ttl).await;
    }

    pub async fn set_ids(&self, key: &CacheKey, ids: &[i64], ttl: Duration) {
        self.write(key, CachedValue::IntList(ids.to_vec()), ttl).await;
    }

    // == Purge ==
    /// Removes the entries of every registered scope of (kind, id).
    pub async fn purge(&self, kind: EntityKind, id: i64) {
        for scope in self.templates.scopes_for(kind) {
            self.purge_scope(scope, kind, id).await;
        }
    }

    /// Removes a single scope's entry for (kind, id).
    pub async fn purge_scope(&self, scope: Scope, kind: EntityKind, id: i64) {
        let key = CacheKey::scoped(kind, scope, id);
        let Some(rendered) = self.render(&key) else {
            return;
        };

        match self.backend.delete(&rendered).await {
            Ok(()) => {
                self.counters.purged();
                debug!(%key, "purged cache entry");
            }
            Err(e) => {
                self.counters.backend_error();
                warn!(%key, error = %e, "cache purge failed");
            }
        }
    }

    // == Stats ==
    /// Snapshot of this cache's counters.
    pub fn stats(&self) -> ScopedCacheStats {
        self.counters.snapshot()
    }

    /// Storage metrics of the backend, when it reports them.
    pub async fn backend_stats(&self) -> Option<StoreStats> {
        self.backend.stats().await
    }

    // == Internals ==
    fn render(&self, key: &CacheKey) -> Option<String> {
        let rendered = self.templates.render(key);
        if rendered.is_none() {
            warn!(%key, "no cache key template registered");
        }
        rendered
    }

    async fn read(&self, key: &CacheKey) -> Option<CachedValue> {
        let rendered = self.render(key)?;
        match self.backend.get(&rendered).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                self.counters.miss();
                None
            }
            Err(e) => {
                self.counters.backend_error();
                warn!(%key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write(&self, key: &CacheKey, value: CachedValue, ttl: Duration) {
        let Some(rendered) = self.render(key) else {
            return;
        };
        if let Err(e) = self.backend.set(&rendered, value, ttl).await {
            self.counters.backend_error();
            warn!(%key, error = %e, "cache write failed, skipping");
        }
    }

    fn hit<T>(&self, value: T) -> Option<T> {
        self.counters.hit();
        Some(value)
    }

    fn mismatch<T>(&self, key: &CacheKey, found: &str, wanted: &str) -> Option<T> {
        self.counters.mismatch();
        debug!(%key, found, wanted, "cached value has another shape, treating as miss");
        None
    }
}
