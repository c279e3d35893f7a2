//! The status-page pipeline: fetch → parse → diff → notify.

use super::{in_maintenance, Monitor, TickError};
use crate::cache::Cache;
use crate::fetch::Fetcher;
use crate::maintenance::MaintenanceWindow;
use crate::notify::Notifier;
use crate::status::page::parse_status_page;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

pub struct StatusMonitor {
    fetcher: Arc<Fetcher>,
    cache: Arc<Mutex<Cache>>,
    notifier: Arc<dyn Notifier>,
    url: Url,
    window: Option<MaintenanceWindow>,
}

impl StatusMonitor {
    pub fn new(
        fetcher: Arc<Fetcher>,
        cache: Arc<Mutex<Cache>>,
        notifier: Arc<dyn Notifier>,
        url: Url,
        window: Option<MaintenanceWindow>,
    ) -> Self {
        StatusMonitor {
            fetcher,
            cache,
            notifier,
            url,
            window,
        }
    }
}

#[async_trait]
impl Monitor for StatusMonitor {
    fn name(&self) -> &'static str {
        "status-page"
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        if in_maintenance(&self.window, self.name()) {
            return Ok(());
        }

        let html = self.fetcher.fetch_text(&self.url).await?;

        let reading = parse_status_page(&html);
        if reading.is_empty() {
            info!("Status page contained no tracked components");
            return Ok(());
        }

        let mut cache = self.cache.lock().await;
        let changed = cache.apply(&reading).await;

        if changed {
            let snapshot = cache.snapshot().clone();
            // Notification happens outside the lock so a slow webhook can't
            // stall the incident loop's cache access.
            drop(cache);

            info!(
                "Component status changed: platform={} persistent-universe={} electronic-access={}",
                snapshot.platform, snapshot.persistent_universe, snapshot.electronic_access
            );

            if let Err(e) = self.notifier.status_changed(&snapshot).await {
                warn!("Status change notification failed: {}", e);
            }
        }

        Ok(())
    }

    async fn flush(&mut self) {
        self.cache.lock().await.flush().await;
    }
}
