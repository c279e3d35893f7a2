//! The boundary through which change events leave the pipeline.
//!
//! The pipeline hands a notifier the full updated snapshot or the novel
//! incident and moves on; formatting and delivery are entirely this side's
//! concern, and delivery failure is never allowed to feed back into change
//! detection.

use crate::status::model::{Incident, StatusSnapshot};
use async_trait::async_trait;
use std::fmt;
use tracing::info;

pub mod format;
pub mod webhook;

pub use webhook::WebhookNotifier;

/// Sum type representing every possible unexceptional delivery fail state.
#[derive(Debug)]
pub enum NotifyError {
    RequestFailed(reqwest::Error),
    Rejected(reqwest::StatusCode),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::RequestFailed(e)
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            NotifyError::RequestFailed(e) => format!("Webhook request failed: {}", e),
            NotifyError::Rejected(status) => format!("Webhook returned status {}", status),
        };

        write!(f, "{}", x)
    }
}

/// Consumes the two event shapes the pipeline emits. Implementations must
/// swallow their own delivery problems into the returned error; callers log
/// it and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn status_changed(&self, snapshot: &StatusSnapshot) -> Result<(), NotifyError>;

    async fn new_incident(&self, incident: &Incident) -> Result<(), NotifyError>;
}

/// Fallback notifier for when no webhook is configured: events land in the
/// log and nowhere else.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn status_changed(&self, snapshot: &StatusSnapshot) -> Result<(), NotifyError> {
        for (component, state) in snapshot.entries() {
            info!(
                "{} {} is {}",
                format::status_emoji(state),
                format::display_name(component),
                state
            );
        }

        Ok(())
    }

    async fn new_incident(&self, incident: &Incident) -> Result<(), NotifyError> {
        info!("New incident: {} ({})", incident.title, incident.id);
        Ok(())
    }
}
