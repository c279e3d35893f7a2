//! Pull the single most recent incident out of the upstream RSS feed.
//!
//! Entries are newest-first, so only the head of the feed is ever
//! considered; novelty against previously announced incidents is the
//! cache's job, not the parser's.

use super::model::{Incident, ServiceState};
use chrono::Utc;
use rss::Channel;
use url::Url;

/// Decode the latest feed entry, or `None` when the feed is empty or
/// unparsable. A missing identifier also yields `None`: an incident we
/// cannot dedupe is one we cannot safely announce.
pub fn parse_incident_feed(xml: &str) -> Option<Incident> {
    let channel = Channel::read_from(xml.as_bytes()).ok()?;
    let item = channel.items().first()?;

    let id = item
        .guid()
        .map(|g| g.value().to_owned())
        .or_else(|| item.link().map(str::to_owned))?;

    let mut status = None;
    let mut affected = Vec::new();

    // Categories double as metadata upstream: a state keyword marks the
    // incident's severity, anything else names an affected system.
    for category in item.categories() {
        let name = category.name().trim();

        match known_state(name) {
            Some(state) => status = status.or(Some(state)),
            None => affected.push(name.to_owned()),
        }
    }

    Some(Incident {
        id,
        title: item.title().unwrap_or_default().to_owned(),
        description: item.description().unwrap_or_default().to_owned(),
        link: item.link().and_then(|l| Url::parse(l).ok()),
        affected,
        status,
        observed_at: Utc::now(),
    })
}

fn known_state(s: &str) -> Option<ServiceState> {
    match ServiceState::from_wire(&s.to_lowercase()) {
        ServiceState::Unknown => None,
        state => Some(state),
    }
}
