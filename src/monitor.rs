//! Fixed-interval polling, one loop per monitored feed.
//!
//! Both feeds run the same schedule machinery with different tick bodies, so
//! the runner here is generic over a [Monitor]; [status::StatusMonitor] and
//! [incident::IncidentMonitor] are the two configured instances. Every tick
//! error is caught and logged — a bad tick never takes the loop down, and the
//! next tick proceeds on schedule regardless.

use crate::fetch::FetchError;
use crate::maintenance::MaintenanceWindow;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

pub mod incident;
pub mod status;

/// Sum type for everything a single tick can fail with. Parse trouble is
/// deliberately absent: an unparsable payload degrades to "no update" inside
/// the tick rather than surfacing here.
#[derive(Debug)]
pub enum TickError {
    Fetch(FetchError),
}

impl From<FetchError> for TickError {
    fn from(e: FetchError) -> Self {
        TickError::Fetch(e)
    }
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickError::Fetch(e) => write!(f, "{}", e),
        }
    }
}

/// One polled feed: a name for the logs, a tick body, and a final flush.
#[async_trait]
pub trait Monitor: Send {
    fn name(&self) -> &'static str;

    async fn tick(&mut self) -> Result<(), TickError>;

    /// Write held state back to the store; called once when the loop stops.
    async fn flush(&mut self);
}

/// Drive a monitor on a fixed interval until shutdown.
///
/// The first tick is held until `ready` flips true. A shutdown signal stops
/// new ticks from starting; a tick already in flight always runs to
/// completion because the select below only cancels while parked on the
/// timer. The monitor is flushed before the task returns.
pub async fn run(
    mut monitor: impl Monitor,
    every: Duration,
    mut ready: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<()>,
) {
    while !*ready.borrow() {
        if ready.changed().await.is_err() {
            // The environment went away before ever becoming ready.
            return;
        }
    }

    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("{} monitor started", monitor.name());

    loop {
        tokio::select! {
            // Checked first so a pending shutdown never starts a new tick.
            biased;
            _ = shutdown.changed() => break,
            _ = timer.tick() => {
                if let Err(e) = monitor.tick().await {
                    error!("{} tick failed: {}", monitor.name(), e);
                }
            }
        }
    }

    monitor.flush().await;
    info!("{} monitor stopped", monitor.name());
}

/// Whether polling should be skipped right now because the upstream is in
/// its daily maintenance window. Skipped ticks change nothing: the snapshot
/// keeps its last real values.
fn in_maintenance(window: &Option<MaintenanceWindow>, name: &str) -> bool {
    let gated = window
        .as_ref()
        .is_some_and(|w| w.contains(Utc::now().time()));

    if gated {
        debug!("{}: inside maintenance window, skipping check", name);
    }

    gated
}
