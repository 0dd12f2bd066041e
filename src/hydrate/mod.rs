//! Hydration Module
//!
//! Turns pages of identifiers into pages of cached views: per-entity
//! read-through fetch, bounded fan-out/gather, pagination and duplicate
//! submission detection.

pub mod aggregator;
pub mod dedup;
pub mod fetcher;
pub mod paginator;

pub use aggregator::{AggregationUnit, Aggregator, DEFAULT_MAX_CONCURRENCY};
pub use dedup::{DedupGuard, Fingerprint, DEFAULT_DEDUP_TTL};
pub use fetcher::{CachedFetcher, CachedView, RecordSource, SummaryFetcher};
pub use paginator::Pagination;
