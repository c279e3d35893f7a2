//! Pure display formatting for outgoing notifications.
//!
//! Nothing here feeds back into change detection; it only decides how an
//! event reads once the pipeline has already decided to announce it.

use crate::status::model::{Component, Incident, ServiceState};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

// These unwraps are tested below.
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static DATE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[20\d{2}").unwrap());

pub fn status_emoji(state: ServiceState) -> &'static str {
    match state {
        ServiceState::Operational => "✅",
        ServiceState::Degraded | ServiceState::Partial => "⚠️",
        ServiceState::Major => "❌",
        ServiceState::Maintenance => "🔧",
        ServiceState::Unknown => "❓",
    }
}

pub fn display_name(component: Component) -> &'static str {
    match component {
        Component::Platform => "Platform",
        Component::PersistentUniverse => "Persistent Universe",
        Component::ElectronicAccess => "Electronic Access",
    }
}

/// An accent for the incident headline, keyed off the title the way the
/// upstream writes them ("... Resolved", "Major ...", "Partial ...").
pub fn title_accent(incident: &Incident) -> &'static str {
    let title = incident.title.to_lowercase();

    if title.contains("resolved") {
        "🟢"
    } else if title.contains("major") {
        "🔴"
    } else if title.contains("partial") {
        "🟠"
    } else {
        "🔵"
    }
}

/// Flatten an HTML-bearing incident description into chat-friendly text.
///
/// The upstream writes one `<p>` per update line, with bracketed date
/// headers like `[2024-10-26 Updates]` introducing each day's section and
/// `HH:MM UTC - message` lines under them. Headers become bold section
/// markers; timestamped lines get their time backticked.
pub fn clean_description(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for p in fragment.select(&PARAGRAPH) {
        let text = p.text().collect::<String>().trim().to_owned();
        if text.is_empty() {
            continue;
        }

        if DATE_HEADER.is_match(&text) {
            if !current.is_empty() {
                sections.push(current.join("\n"));
                current.clear();
            }
            sections.push(format!("\n**{}**", text));
        } else {
            current.push(normalize_timestamp(&text));
        }
    }

    if !current.is_empty() {
        sections.push(current.join("\n"));
    }

    sections.join("\n")
}

fn normalize_timestamp(text: &str) -> String {
    match text.split_once(" UTC - ") {
        Some((time, message)) => format!("`{} UTC` - {}", time, message),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statics_build() {
        let _ = (&*PARAGRAPH, &*DATE_HEADER);
    }

    #[test]
    fn test_emoji_covers_all_states() {
        assert_eq!(status_emoji(ServiceState::Operational), "✅");
        assert_eq!(status_emoji(ServiceState::Major), "❌");
        assert_eq!(status_emoji(ServiceState::Maintenance), "🔧");
        assert_eq!(status_emoji(ServiceState::Unknown), "❓");
        assert_eq!(
            status_emoji(ServiceState::Degraded),
            status_emoji(ServiceState::Partial)
        );
    }

    #[test]
    fn test_clean_description_sections_and_timestamps() {
        let html = "<p>[2024-10-26 Updates]</p>\
                    <p>12:00 UTC - Investigating elevated error rates</p>\
                    <p>14:30 UTC - Mitigated</p>\
                    <p>[2024-10-27 Updates]</p>\
                    <p>Post-incident review underway</p>";

        let cleaned = clean_description(html);

        assert_eq!(
            cleaned,
            "\n**[2024-10-26 Updates]**\n\
             `12:00 UTC` - Investigating elevated error rates\n\
             `14:30 UTC` - Mitigated\n\
             \n**[2024-10-27 Updates]**\n\
             Post-incident review underway"
        );
    }

    #[test]
    fn test_clean_description_without_headers() {
        let html = "<p>03:15 UTC - Maintenance started</p><p>All services down briefly</p>";

        assert_eq!(
            clean_description(html),
            "`03:15 UTC` - Maintenance started\nAll services down briefly"
        );
    }

    #[test]
    fn test_clean_description_skips_empty_paragraphs() {
        let html = "<p></p><p>  </p><p>Something happened</p>";
        assert_eq!(clean_description(html), "Something happened");
    }

    #[test]
    fn test_clean_description_of_plain_text() {
        // No paragraphs means nothing survives the flattening.
        assert_eq!(clean_description("no markup at all"), "");
    }

    #[test]
    fn test_title_accents() {
        use chrono::Utc;

        let incident = |title: &str| Incident {
            id: "i".into(),
            title: title.into(),
            description: String::new(),
            link: None,
            affected: Vec::new(),
            status: None,
            observed_at: Utc::now(),
        };

        assert_eq!(title_accent(&incident("Platform Issue Resolved")), "🟢");
        assert_eq!(title_accent(&incident("Major Service Outage")), "🔴");
        assert_eq!(title_accent(&incident("Partial Degradation")), "🟠");
        assert_eq!(title_accent(&incident("Scheduled Maintenance")), "🔵");
    }
}
