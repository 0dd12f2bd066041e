//! Cache Module
//!
//! Scoped, fail-open result cache: key registry, value envelope, backends and
//! the `ScopedCache` facade used by the rest of the crate.

pub mod backend;
mod entry;
pub mod keys;
mod lru;
#[cfg(feature = "cache-redis")]
pub mod redis;
mod scoped;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{BackendError, CacheBackend, MemoryBackend};
pub use entry::{CacheEntry, CacheRecord, CachedValue};
pub use keys::{CacheKey, EntityKind, KeyTemplates, Scope};
pub use lru::LruTracker;
pub use scoped::ScopedCache;
pub use stats::{ScopedCacheStats, StoreStats};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
