//! Cache Entry Module
//!
//! Defines the value envelope stored by every backend and the in-memory entry
//! wrapper carrying TTL metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

// == Cache Record ==
/// A type that can be stored as a `CachedValue::Record`.
///
/// `SCHEMA` is written next to the serialized body and checked on read, so a
/// value written by another type (or an older layout) reads back as a miss.
pub trait CacheRecord: Serialize + DeserializeOwned {
    /// Schema/version discriminator, e.g. `profile_summary.v1`
    const SCHEMA: &'static str;
}

// == Cached Value ==
/// Tagged envelope for everything the cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachedValue {
    /// Entity-shaped record with its schema tag
    Record {
        schema: String,
        body: serde_json::Value,
    },
    /// Scalar counter
    Int(i64),
    /// List of identifiers
    IntList(Vec<i64>),
}

impl CachedValue {
    // == Constructors ==
    /// Encodes a record. Fails only if `T`'s `Serialize` impl fails.
    pub fn record<T: CacheRecord>(value: &T) -> serde_json::Result<Self> {
        Ok(CachedValue::Record {
            schema: T::SCHEMA.to_string(),
            body: serde_json::to_value(value)?,
        })
    }

    // == Typed Accessors ==
    /// Decodes a record of type `T`.
    ///
    /// Returns `None` when the envelope holds another shape, another schema,
    /// or a body that does not decode as `T`.
    pub fn into_record<T: CacheRecord>(self) -> Option<T> {
        match self {
            CachedValue::Record { schema, body } if schema == T::SCHEMA => {
                serde_json::from_value(body).ok()
            }
            _ => None,
        }
    }

    /// Returns the counter, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CachedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the identifier list, if this is one.
    pub fn into_ids(self) -> Option<Vec<i64>> {
        match self {
            CachedValue::IntList(ids) => Some(ids),
            _ => None,
        }
    }

    /// Short name of the stored shape, used in log lines.
    pub fn shape(&self) -> &str {
        match self {
            CachedValue::Record { schema, .. } => schema,
            CachedValue::Int(_) => "int",
            CachedValue::IntList(_) => "int_list",
        }
    }
}

// == Cache Entry ==
/// A stored value with its creation time and expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CachedValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry; the TTL counts from now.
    pub fn new(value: CachedValue, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        // Saturates instead of wrapping for absurd TTLs
        let expires_at = ttl.map(|ttl| {
            now.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
        });

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the deadline.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
