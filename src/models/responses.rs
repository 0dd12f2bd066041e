//! Response DTOs for the REST API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{ScopedCacheStats, StoreStats};
use crate::hydrate::Pagination;
use crate::models::{Event, ItemType};

/// One page of hydrated items plus paging metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub pages: i64,
    pub max_offset: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, page: Pagination) -> Self {
        Self {
            items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            pages: page.pages,
            max_offset: page.max_offset,
        }
    }
}

/// Event detail with its live attendee count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub rsvp_attending: i64,
}

/// Body of `GET .../attendees/:profile_id`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendingResponse {
    pub event_id: i64,
    pub profile_id: i64,
    pub attending: bool,
}

/// Body of `GET .../ignores/:item_type/:item_id` and of an ignore
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoringResponse {
    pub profile_id: i64,
    pub item_type: ItemType,
    pub item_id: i64,
    pub ignoring: bool,
}

/// Body of `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: ScopedCacheStats,
    /// Hit rate (hits / all reads)
    pub hit_rate: f64,
    /// Present when the backend reports storage metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreStats>,
}

impl StatsResponse {
    pub fn new(cache: ScopedCacheStats, store: Option<StoreStats>) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            store,
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
