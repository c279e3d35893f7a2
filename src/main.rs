//! The hundred-eyed watchman.
//!
//! Argus polls an upstream status page and incident feed on independent
//! timers, diffs what it sees against state cached in an external store, and
//! forwards changes to a chat webhook. Once running it needs no attention:
//! failed ticks are logged and retried on the next interval, and state
//! survives restarts through the store.

use config::Config;
use fetch::Fetcher;
use monitor::incident::IncidentMonitor;
use monitor::status::StatusMonitor;
use notify::{LogNotifier, Notifier, WebhookNotifier};
use std::sync::Arc;
use store::{KvStore, MemoryStore, RedisStore};
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

mod cache;
mod config;
mod fetch;
mod maintenance;
mod monitor;
mod notify;
mod status;
mod store;

/// Application entrypoint. Initialises tracing, resolves configuration,
/// wires the two monitors to their shared cache, and runs until a shutdown
/// signal arrives.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let has_dotenv = dotenvy::dotenv().is_ok();
    if !has_dotenv {
        warn!("No .env found");
    }

    let config = Config::from_env();

    let store: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => {
            let pool = deadpool_redis::Config::from_url(url.clone())
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .expect("Could not create Redis pool");
            Arc::new(RedisStore::new(pool))
        }
        None => {
            warn!("No $REDIS_URL found; cached state will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => {
            warn!("No $WEBHOOK_URL found; events will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let fetcher = Arc::new(
        Fetcher::new(
            config.request_timeout,
            config.max_retries,
            config.retry_backoff,
        )
        .expect("Could not build HTTP client"),
    );

    // Both monitors share one cache so their store writes stay serialized.
    let cache = Arc::new(Mutex::new(
        cache::Cache::load(Arc::clone(&store), config.status_ttl).await,
    ));

    let (ready_tx, ready_rx) = watch::channel(false);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let status_task = tokio::spawn(monitor::run(
        StatusMonitor::new(
            Arc::clone(&fetcher),
            Arc::clone(&cache),
            Arc::clone(&notifier),
            config.status_url.clone(),
            Some(config.maintenance),
        ),
        config.poll_interval,
        ready_rx.clone(),
        shutdown_rx.clone(),
    ));

    let incident_task = tokio::spawn(monitor::run(
        IncidentMonitor::new(
            fetcher,
            Arc::clone(&cache),
            notifier,
            config.feed_url.clone(),
            Some(config.maintenance),
        ),
        config.poll_interval,
        ready_rx,
        shutdown_rx,
    ));

    // Release the monitors once the store has answered; a dead store is
    // worth knowing about but doesn't stop the bot, the in-memory snapshot
    // carries it until the store recovers.
    if let Err(e) = store.ping().await {
        error!("Store unreachable at startup: {}", e);
    }
    ready_tx.send(true).ok();
    info!("Monitors released");

    shutdown_signal().await;
    info!("Shutting down");
    shutdown_tx.send(()).ok();

    // The monitors flush cached state to the store before returning.
    let _ = status_task.await;
    let _ = incident_task.await;
    info!("Shut down cleanly");
}

/// Resolves when the process receives Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
