//! Summary Fetcher
//!
//! Per-entity get-or-compute on top of `ScopedCache`.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{CacheKey, CacheRecord, EntityKind, Scope, ScopedCache};
use crate::error::{AppError, Result};

// == Cached View ==
/// A projection of an entity that lives in one cache scope.
pub trait CachedView: CacheRecord + Clone + Send + Sync + 'static {
    const KIND: EntityKind;
    const SCOPE: Scope;

    /// Tenant that owns the entity.
    fn site_id(&self) -> i64;

    /// Fills in derived fields (links, formatted timestamps) after a load.
    fn enrich(&mut self) {}
}

// == Record Source ==
/// Authoritative loader for a view, usually the data store.
#[async_trait]
pub trait RecordSource<V>: Send + Sync + 'static {
    /// Loads `id` as seen by `site_id`. Returns `NotFound` when absent.
    async fn load(&self, site_id: i64, id: i64) -> Result<V>;
}

// == Summary Fetcher ==
/// Produces one hydrated item for an aggregation unit.
#[async_trait]
pub trait SummaryFetcher: Send + Sync + 'static {
    type Item: Send + 'static;

    async fn fetch(&self, site_id: i64, id: i64) -> Result<Self::Item>;
}

/// Read-through fetcher: cache first, then the source, then write back.
pub struct CachedFetcher<V, S> {
    cache: ScopedCache,
    source: Arc<S>,
    ttl: Duration,
    _view: PhantomData<fn() -> V>,
}

impl<V, S> CachedFetcher<V, S>
where
    V: CachedView,
    S: RecordSource<V>,
{
    pub fn new(cache: ScopedCache, source: Arc<S>, ttl: Duration) -> Self {
        Self {
            cache,
            source,
            ttl,
            _view: PhantomData,
        }
    }

    /// Returns the view for `id`, reading through the cache.
    pub async fn get(&self, site_id: i64, id: i64) -> Result<V> {
        if id == 0 {
            return Err(AppError::NotFound(format!("{} not found", V::KIND)));
        }

        let key = CacheKey::scoped(V::KIND, V::SCOPE, id);
        if let Some(cached) = self.cache.get_record::<V>(&key).await {
            if cached.site_id() != site_id {
                debug!(%key, site_id, owner = cached.site_id(), "cached record belongs to another site");
                return Err(not_found::<V>(id));
            }
            return Ok(cached);
        }

        let mut view = self.source.load(site_id, id).await?;
        if view.site_id() != site_id {
            return Err(not_found::<V>(id));
        }
        view.enrich();
        self.cache.set_record(&key, &view, self.ttl).await;

        Ok(view)
    }
}

fn not_found<V: CachedView>(id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", V::KIND, id))
}

#[async_trait]
impl<V, S> SummaryFetcher for CachedFetcher<V, S>
where
    V: CachedView,
    S: RecordSource<V>,
{
    type Item = V;

    async fn fetch(&self, site_id: i64, id: i64) -> Result<V> {
        self.get(site_id, id).await
    }
}
