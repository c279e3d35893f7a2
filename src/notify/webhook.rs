//! Deliver events to a chat incoming-webhook as Block Kit payloads.
//!
//! The webhook URL is the only coupling to the chat platform; the payload
//! shape is the widely-copied "blocks plus fallback text" form, so anything
//! Slack-compatible can receive it.

use super::{format, NotifyError, Notifier};
use crate::status::model::{Incident, StatusSnapshot};
use async_trait::async_trait;
use serde::ser::{self, Serialize, SerializeStruct};
use url::Url;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Self {
        WebhookNotifier {
            client: reqwest::Client::new(),
            url,
        }
    }

    async fn post(&self, payload: &Payload) -> Result<(), NotifyError> {
        let res = self
            .client
            .post(self.url.clone())
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(status))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn status_changed(&self, snapshot: &StatusSnapshot) -> Result<(), NotifyError> {
        self.post(&status_payload(snapshot)).await
    }

    async fn new_incident(&self, incident: &Incident) -> Result<(), NotifyError> {
        self.post(&incident_payload(incident)).await
    }
}

#[derive(serde::Serialize)]
struct Payload {
    // Used for notifications in the presence of `blocks`.
    text: String,
    blocks: Vec<Block>,
}

/// Our limited subset of the Block Kit block types.
enum Block {
    Header(String),
    Mrkdwn(String),
}

// This won't scale to other block types but for now is simpler than a more
// custom serialisation implementation.
#[derive(serde::Serialize)]
struct RawTextBlock<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    text: &'a String,
}

impl Serialize for Block {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut state = serializer.serialize_struct("Block", 2)?;

        match self {
            Block::Header(x) => {
                state.serialize_field("type", "header")?;

                let inner = RawTextBlock {
                    typ: "plain_text",
                    text: x,
                };
                state.serialize_field("text", &inner)?;
            }

            Block::Mrkdwn(x) => {
                state.serialize_field("type", "section")?;

                let inner = RawTextBlock {
                    typ: "mrkdwn",
                    text: x,
                };
                state.serialize_field("text", &inner)?;
            }
        };

        state.end()
    }
}

fn status_payload(snapshot: &StatusSnapshot) -> Payload {
    let lines: Vec<String> = snapshot
        .entries()
        .into_iter()
        .map(|(component, state)| {
            format!(
                "{} *{}*: {}",
                format::status_emoji(state),
                format::display_name(component),
                state
            )
        })
        .collect();

    Payload {
        text: format!("Service status update: {}", summary(snapshot)),
        blocks: vec![
            Block::Header("🖥️ Service Status".into()),
            Block::Mrkdwn(lines.join("\n")),
        ],
    }
}

fn incident_payload(incident: &Incident) -> Payload {
    let mut blocks = vec![Block::Header(format!(
        "{} {}",
        format::title_accent(incident),
        incident.title
    ))];

    let desc = format::clean_description(&incident.description);
    let desc = if desc.is_empty() {
        incident.description.clone()
    } else {
        desc
    };
    if !desc.is_empty() {
        blocks.push(Block::Mrkdwn(desc));
    }

    if let Some(status) = incident.status {
        blocks.push(Block::Mrkdwn(format!(
            "Status: {} {}",
            format::status_emoji(status),
            status
        )));
    }

    if !incident.affected.is_empty() {
        let systems: Vec<String> = incident
            .affected
            .iter()
            .map(|name| format!("- {}", name))
            .collect();
        blocks.push(Block::Mrkdwn(format!(
            "🎯 *Affected Systems*\n{}",
            systems.join("\n")
        )));
    }

    if let Some(link) = &incident.link {
        blocks.push(Block::Mrkdwn(format!("📑 <{}|View on the status page>", link)));
    }

    Payload {
        text: incident.title.clone(),
        blocks,
    }
}

fn summary(snapshot: &StatusSnapshot) -> String {
    snapshot
        .entries()
        .into_iter()
        .map(|(component, state)| format!("{} {}", format::display_name(component), state))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::model::ServiceState;
    use chrono::Utc;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            platform: ServiceState::Major,
            persistent_universe: ServiceState::Operational,
            electronic_access: ServiceState::Operational,
        }
    }

    fn incident() -> Incident {
        Incident {
            id: "inc-1".into(),
            title: "Major Service Outage".into(),
            description: "<p>12:00 UTC - Investigating</p>".into(),
            link: Some(Url::parse("https://status.example.com/incidents/1").unwrap()),
            affected: vec!["Persistent Universe".into()],
            status: Some(ServiceState::Major),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_block_serialization() {
        let header = serde_json::to_value(Block::Header("hello".into())).unwrap();
        assert_eq!(
            header,
            serde_json::json!({
                "type": "header",
                "text": { "type": "plain_text", "text": "hello" }
            })
        );

        let section = serde_json::to_value(Block::Mrkdwn("*bold*".into())).unwrap();
        assert_eq!(
            section,
            serde_json::json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": "*bold*" }
            })
        );
    }

    #[test]
    fn test_status_payload_lists_every_component() {
        let payload = status_payload(&snapshot());

        assert!(payload.text.contains("Platform major"));
        assert_eq!(payload.blocks.len(), 2);

        let body = serde_json::to_string(&payload).unwrap();
        assert!(body.contains("Persistent Universe"));
        assert!(body.contains("Electronic Access"));
        assert!(body.contains("❌"));
    }

    #[test]
    fn test_incident_payload_structure() {
        let payload = incident_payload(&incident());
        let body = serde_json::to_string(&payload).unwrap();

        assert_eq!(payload.text, "Major Service Outage");
        assert!(body.contains("🔴"));
        assert!(body.contains("`12:00 UTC` - Investigating"));
        assert!(body.contains("Affected Systems"));
        assert!(body.contains("status.example.com"));
    }

    #[tokio::test]
    async fn test_post_delivers_and_reports_rejection() {
        let mut srv = mockito::Server::new_async().await;

        let ok = srv
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(Url::parse(&format!("{}/hook", srv.url())).unwrap());

        notifier.status_changed(&snapshot()).await.unwrap();
        ok.assert_async().await;
        ok.remove_async().await;

        let rejecting = srv
            .mock("POST", "/hook")
            .with_status(410)
            .create_async()
            .await;

        let err = notifier.new_incident(&incident()).await.unwrap_err();
        rejecting.assert_async().await;

        match err {
            NotifyError::Rejected(status) => assert_eq!(status.as_u16(), 410),
            e => panic!("unexpected error: {}", e),
        }
    }
}
