//! Change detection against last-known state, with durability via the
//! external store.
//!
//! The cache owns the process's belief about the world: the status snapshot
//! and the identifier of the last announced incident. Both are restored from
//! the store at startup and written back as they change, so a restart
//! neither re-announces old incidents nor forgets component states. The
//! in-memory copy is authoritative; a store outage costs durability for that
//! write only, never correctness of the running process.

use crate::status::model::{Component, Incident, PartialReading, ServiceState, StatusSnapshot};
use crate::store::KvStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const SNAPSHOT_KEY: &str = "system_status";
const LAST_INCIDENT_KEY: &str = "last_incident_id";
const LATEST_INCIDENT_KEY: &str = "latest_incident";

pub struct Cache {
    store: Arc<dyn KvStore>,
    snapshot: StatusSnapshot,
    last_incident_id: Option<String>,
    /// TTL for snapshot and incident-record keys, sized to the polling
    /// cadence so a long-dead process can't serve stale state. The last
    /// announced incident id deliberately never expires.
    status_ttl: Duration,
}

impl Cache {
    /// Restore cached state from the store. Store trouble degrades to the
    /// defaults: an all-unknown snapshot and no known incident.
    pub async fn load(store: Arc<dyn KvStore>, status_ttl: Duration) -> Cache {
        let mut snapshot = StatusSnapshot::default();

        match store.hgetall(SNAPSHOT_KEY).await {
            Ok(fields) => {
                for (field, value) in &fields {
                    if let Some(component) = Component::from_field(field) {
                        snapshot.set(component, ServiceState::from_wire(value));
                    }
                }
            }
            Err(e) => error!("Could not restore status snapshot: {}", e),
        }

        let last_incident_id = match store.get(LAST_INCIDENT_KEY).await {
            Ok(id) => id,
            Err(e) => {
                error!("Could not restore last incident id: {}", e);
                None
            }
        };

        Cache {
            store,
            snapshot,
            last_incident_id,
            status_ttl,
        }
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    /// Merge a partial reading over the held snapshot. Returns whether any
    /// component's state changed; the full snapshot is persisted whenever it
    /// did. Feeding the same reading twice reports a change at most once.
    pub async fn apply(&mut self, reading: &PartialReading) -> bool {
        let changed = self.snapshot.merge(reading);

        if changed {
            self.persist_snapshot().await;
        }

        changed
    }

    /// Whether this incident has not been announced before. A novel id is
    /// recorded immediately, in memory and in the store, so the answer is
    /// true exactly once per distinct id, restarts included.
    pub async fn note_incident(&mut self, incident: &Incident) -> bool {
        if self.last_incident_id.as_deref() == Some(incident.id.as_str()) {
            return false;
        }

        self.last_incident_id = Some(incident.id.clone());

        if let Err(e) = self.store.set(LAST_INCIDENT_KEY, &incident.id, None).await {
            error!("Could not persist last incident id: {}", e);
        }

        true
    }

    /// The incident record cached by a previous tick, if it's still live and
    /// decodes cleanly. Anything else reads as absent.
    pub async fn recall_incident(&self) -> Option<Incident> {
        let raw = match self.store.get(LATEST_INCIDENT_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!("Could not read cached incident: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(incident) => Some(incident),
            Err(e) => {
                error!("Discarding undecodable cached incident: {}", e);
                None
            }
        }
    }

    /// Cache a freshly parsed incident record so the next few ticks can skip
    /// the feed fetch. Ages out with [Cache::status_ttl].
    pub async fn remember_incident(&self, incident: &Incident) {
        match serde_json::to_string(incident) {
            Ok(json) => {
                if let Err(e) = self
                    .store
                    .set(LATEST_INCIDENT_KEY, &json, Some(self.status_ttl))
                    .await
                {
                    error!("Could not cache incident record: {}", e);
                }
            }
            Err(e) => error!("Could not encode incident record: {}", e),
        }
    }

    /// Best-effort write-back of everything held, for shutdown.
    pub async fn flush(&self) {
        self.persist_snapshot().await;

        if let Some(id) = &self.last_incident_id {
            if let Err(e) = self.store.set(LAST_INCIDENT_KEY, id, None).await {
                error!("Could not flush last incident id: {}", e);
            }
        }
    }

    async fn persist_snapshot(&self) {
        let entries = self.snapshot.entries();
        let fields: Vec<(&str, &str)> = entries
            .iter()
            .map(|(component, state)| (component.as_str(), state.as_str()))
            .collect();

        if let Err(e) = self.store.hset(SNAPSHOT_KEY, &fields).await {
            error!("Could not persist status snapshot: {}", e);
            return;
        }

        if let Err(e) = self.store.expire(SNAPSHOT_KEY, self.status_ttl).await {
            error!("Could not set snapshot expiry: {}", e);
        }
    }
}
