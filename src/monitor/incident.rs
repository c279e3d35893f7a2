//! The incident-feed pipeline: fetch → parse → novelty check → notify.

use super::{in_maintenance, Monitor, TickError};
use crate::cache::Cache;
use crate::fetch::Fetcher;
use crate::maintenance::MaintenanceWindow;
use crate::notify::Notifier;
use crate::status::feed::parse_incident_feed;
use crate::status::model::Incident;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub struct IncidentMonitor {
    fetcher: Arc<Fetcher>,
    cache: Arc<Mutex<Cache>>,
    notifier: Arc<dyn Notifier>,
    url: Url,
    window: Option<MaintenanceWindow>,
}

impl IncidentMonitor {
    pub fn new(
        fetcher: Arc<Fetcher>,
        cache: Arc<Mutex<Cache>>,
        notifier: Arc<dyn Notifier>,
        url: Url,
        window: Option<MaintenanceWindow>,
    ) -> Self {
        IncidentMonitor {
            fetcher,
            cache,
            notifier,
            url,
            window,
        }
    }

    /// The latest incident, from the cached record when one is still live,
    /// otherwise freshly fetched and cached for the next few ticks.
    async fn latest_incident(&self) -> Result<Option<Incident>, TickError> {
        if let Some(incident) = self.cache.lock().await.recall_incident().await {
            debug!("Using cached incident record");
            return Ok(Some(incident));
        }

        let xml = self.fetcher.fetch_text(&self.url).await?;

        match parse_incident_feed(&xml) {
            Some(incident) => {
                self.cache.lock().await.remember_incident(&incident).await;
                Ok(Some(incident))
            }
            None => {
                info!("Incident feed was empty or unparsable");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Monitor for IncidentMonitor {
    fn name(&self) -> &'static str {
        "incident-feed"
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        if in_maintenance(&self.window, self.name()) {
            return Ok(());
        }

        let Some(incident) = self.latest_incident().await? else {
            return Ok(());
        };

        let novel = self.cache.lock().await.note_incident(&incident).await;

        if novel {
            info!("New incident detected: {}", incident.title);

            if let Err(e) = self.notifier.new_incident(&incident).await {
                warn!("Incident notification failed: {}", e);
            }
        }

        Ok(())
    }

    async fn flush(&mut self) {
        self.cache.lock().await.flush().await;
    }
}
