//! Cache Statistics Module
//!
//! `StoreStats` describes the memory backend's storage; `ScopedCacheStats` is
//! a snapshot of the counters kept by `ScopedCache` for any backend.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Store Stats ==
/// Storage metrics of the in-memory backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Entries removed to make room for new ones
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries
    pub total_entries: usize,
}

impl StoreStats {
    /// Creates a new StoreStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Scoped Cache Stats ==
/// Point-in-time view of `ScopedCache` activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopedCacheStats {
    /// Reads that returned a usable value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Reads that found a value of the wrong shape or schema
    pub mismatches: u64,
    /// Backend failures absorbed as misses or no-ops
    pub backend_errors: u64,
    /// Keys deleted by purge calls
    pub purged_keys: u64,
}

impl ScopedCacheStats {
    // == Hit Rate ==
    /// Returns hits / all reads, or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.mismatches;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Counters ==
/// Lock-free counters shared by all clones of a `ScopedCache`.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    mismatches: AtomicU64,
    backend_errors: AtomicU64,
    purged_keys: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mismatch(&self) {
        self.mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn backend_error(&self) {
        self.backend_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn purged(&self) {
        self.purged_keys.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ScopedCacheStats {
        ScopedCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            mismatches: self.mismatches.load(Ordering::Relaxed),
            backend_errors: self.backend_errors.load(Ordering::Relaxed),
            purged_keys: self.purged_keys.load(Ordering::Relaxed),
        }
    }
}
