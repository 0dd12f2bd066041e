//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of the
//! in-process cache backend. Reads already skip expired entries; the sweep
//! only returns their memory.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryBackend;

/// Spawns a background task that removes expired entries every
/// `cleanup_interval_secs` seconds (at least one).
///
/// The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let backend = MemoryBackend::new(10_000);
/// let cleanup_handle = spawn_cleanup_task(backend.clone(), 30);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(backend: MemoryBackend, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting TTL cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "TTL cleanup: removed expired entries");
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
