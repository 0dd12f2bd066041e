//! Redis Backend
//!
//! Stores `CachedValue` envelopes as JSON strings with `SETEX`, so expiry is
//! handled by the Redis server. Compiled with the `cache-redis` feature.

use std::time::Duration;

use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use ::redis::Client;
use tokio::time::timeout;
use tracing::info;

use crate::cache::backend::{BackendError, CacheBackend};
use crate::cache::CachedValue;

/// Upper bound for any single Redis round trip.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Prefix applied to every key written by this process.
const KEY_PREFIX: &str = "forum:";

// == Redis Backend ==
/// Backend talking to a Redis server through a reconnecting connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`) and verifies with PING.
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = Client::open(url).map_err(unavailable)?;
        let mut conn = timeout(COMMAND_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| BackendError::Unavailable(format!("timed out connecting to {url}")))?
            .map_err(unavailable)?;

        let pong: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        if pong != "PONG" {
            return Err(BackendError::Unavailable(format!(
                "unexpected PING reply: {pong}"
            )));
        }

        info!("Redis cache backend connected at {}", url);
        Ok(Self { conn })
    }

    fn full_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

fn unavailable(err: ::redis::RedisError) -> BackendError {
    BackendError::Unavailable(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>, BackendError> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(Self::full_key(key));

        let raw: Option<String> = timeout(COMMAND_TIMEOUT, cmd.query_async(&mut conn))
            .await
            .map_err(|_| BackendError::Unavailable("GET timed out".to_string()))?
            .map_err(unavailable)?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<(), BackendError> {
        let payload = serde_json::to_string(&value)?;
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("SETEX");
        // Redis rejects a zero expiry
        cmd.arg(Self::full_key(key))
            .arg(ttl.as_secs().max(1))
            .arg(payload);

        let _: () = timeout(COMMAND_TIMEOUT, cmd.query_async(&mut conn))
            .await
            .map_err(|_| BackendError::Unavailable("SETEX timed out".to_string()))?
            .map_err(unavailable)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(Self::full_key(key));

        let _: i64 = timeout(COMMAND_TIMEOUT, cmd.query_async(&mut conn))
            .await
            .map_err(|_| BackendError::Unavailable("DEL timed out".to_string()))?
            .map_err(unavailable)?;

        Ok(())
    }
}
