//! forum_core server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_core::cache::{CacheBackend, MemoryBackend};
use forum_core::{create_router, spawn_cleanup_task, AppState, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Pick the cache backend (Redis when configured, in-process otherwise)
/// 4. Start background TTL cleanup task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server and handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting forum_core server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        max_entries = config.max_entries,
        record_ttl = config.record_ttl,
        dedup_ttl = config.dedup_ttl,
        concurrency = config.aggregate_concurrency,
        "Configuration loaded"
    );

    let memory = MemoryBackend::new(config.max_entries);
    let backend = select_backend(&config, &memory).await;
    let state = AppState::from_config(&config, backend);

    let cleanup_handle = spawn_cleanup_task(memory, config.cleanup_interval);
    info!("Background cleanup task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Redis when `REDIS_URL` is set and reachable, the in-process store otherwise.
async fn select_backend(config: &Config, memory: &MemoryBackend) -> Arc<dyn CacheBackend> {
    if let Some(redis) = connect_redis(config).await {
        return redis;
    }

    info!(max_entries = config.max_entries, "Using in-process cache backend");
    Arc::new(memory.clone())
}

#[cfg(feature = "cache-redis")]
async fn connect_redis(config: &Config) -> Option<Arc<dyn CacheBackend>> {
    let url = config.redis_url.as_deref()?;
    match forum_core::cache::redis::RedisBackend::connect(url).await {
        Ok(redis) => {
            info!("Using Redis cache backend");
            let backend: Arc<dyn CacheBackend> = Arc::new(redis);
            Some(backend)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, falling back to in-process cache");
            None
        }
    }
}

#[cfg(not(feature = "cache-redis"))]
async fn connect_redis(config: &Config) -> Option<Arc<dyn CacheBackend>> {
    if config.redis_url.is_some() {
        warn!("REDIS_URL is set but this build lacks the cache-redis feature");
    }
    None
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the cleanup task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
