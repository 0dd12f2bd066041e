//! Duplicate submission guard.
//!
//! A create request is fingerprinted from its significant fields. The id it
//! produced is remembered under `dupe_{fingerprint}` for a few minutes, and a
//! resubmission inside that window gets the earlier id back.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{CacheKey, ScopedCache};
use crate::error::{AppError, Result};

// == Constants ==
/// Default lifetime of a dedup token
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(300);

// == Fingerprint ==
/// Hex SHA-256 of the JSON encoding of a request's significant fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<T: Serialize>(fields: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(fields)
            .map_err(|e| AppError::Internal(format!("could not fingerprint request: {e}")))?;
        Ok(Self(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn key(&self) -> CacheKey {
        CacheKey::dedup(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Dedup Guard ==
#[derive(Clone)]
pub struct DedupGuard {
    cache: ScopedCache,
    ttl: Duration,
}

impl DedupGuard {
    pub fn new(cache: ScopedCache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    // == Check ==
    /// Id created by an identical earlier request, if still remembered.
    pub async fn check(&self, fingerprint: &Fingerprint) -> Option<i64> {
        let id = self.cache.get_int(&fingerprint.key()).await;
        if let Some(id) = id {
            debug!(%fingerprint, id, "duplicate submission");
        }
        id
    }

    pub async fn remember(&self, fingerprint: &Fingerprint, id: i64) {
        self.cache.set_int(&fingerprint.key(), id, self.ttl).await;
    }
}
