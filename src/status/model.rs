//! The shared vocabulary of the monitoring pipeline: tracked components,
//! their states, full and partial status snapshots, and incidents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// The three tracked facets of the upstream service.
///
/// The set is closed: anything else on the status page is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "platform")]
    Platform,
    #[serde(rename = "persistent-universe")]
    PersistentUniverse,
    #[serde(rename = "electronic-access")]
    ElectronicAccess,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Platform,
        Component::PersistentUniverse,
        Component::ElectronicAccess,
    ];

    /// The stable name used for persistence fields and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Platform => "platform",
            Component::PersistentUniverse => "persistent-universe",
            Component::ElectronicAccess => "electronic-access",
        }
    }

    pub fn from_field(s: &str) -> Option<Component> {
        Component::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Match a human-facing label from the status page onto a tracked
    /// component, by case-insensitive substring. The upstream page labels
    /// "Arena Commander" what we track as electronic access.
    pub fn from_label(label: &str) -> Option<Component> {
        let label = label.to_lowercase();

        if label.contains("platform") {
            Some(Component::Platform)
        } else if label.contains("persistent universe") {
            Some(Component::PersistentUniverse)
        } else if label.contains("arena commander") {
            Some(Component::ElectronicAccess)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The condition of a single component as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Operational,
    Degraded,
    Partial,
    Major,
    Maintenance,
    Unknown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Operational => "operational",
            ServiceState::Degraded => "degraded",
            ServiceState::Partial => "partial",
            ServiceState::Major => "major",
            ServiceState::Maintenance => "maintenance",
            ServiceState::Unknown => "unknown",
        }
    }

    /// Decode the upstream wire form. Anything unrecognized collapses to
    /// [ServiceState::Unknown] rather than failing the surrounding record.
    pub fn from_wire(s: &str) -> ServiceState {
        match s {
            "operational" => ServiceState::Operational,
            "degraded" => ServiceState::Degraded,
            "partial" => ServiceState::Partial,
            "major" => ServiceState::Major,
            "maintenance" => ServiceState::Maintenance,
            _ => ServiceState::Unknown,
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The complete current belief about all tracked components.
///
/// Always fully populated: a component nobody has reported on yet is
/// [ServiceState::Unknown], never absent. State transitions are overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub platform: ServiceState,
    #[serde(rename = "persistent-universe")]
    pub persistent_universe: ServiceState,
    #[serde(rename = "electronic-access")]
    pub electronic_access: ServiceState,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusSnapshot {
            platform: ServiceState::Unknown,
            persistent_universe: ServiceState::Unknown,
            electronic_access: ServiceState::Unknown,
        }
    }
}

impl StatusSnapshot {
    pub fn get(&self, component: Component) -> ServiceState {
        match component {
            Component::Platform => self.platform,
            Component::PersistentUniverse => self.persistent_universe,
            Component::ElectronicAccess => self.electronic_access,
        }
    }

    pub fn set(&mut self, component: Component, state: ServiceState) {
        match component {
            Component::Platform => self.platform = state,
            Component::PersistentUniverse => self.persistent_universe = state,
            Component::ElectronicAccess => self.electronic_access = state,
        }
    }

    /// All components with their current states, in declaration order.
    pub fn entries(&self) -> [(Component, ServiceState); 3] {
        [
            (Component::Platform, self.platform),
            (Component::PersistentUniverse, self.persistent_universe),
            (Component::ElectronicAccess, self.electronic_access),
        ]
    }

    /// Merge a partial reading over this snapshot, component by component.
    /// Components the reading doesn't mention keep their held state. Returns
    /// whether any component's state actually changed.
    pub fn merge(&mut self, reading: &PartialReading) -> bool {
        let mut changed = false;

        for &(component, state) in reading.iter() {
            if self.get(component) != state {
                changed = true;
            }
            self.set(component, state);
        }

        changed
    }
}

/// The subset of components a single parse actually found, in page order.
///
/// Never merged wholesale: callers fold this into a [StatusSnapshot] so an
/// absent component retains its last known state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialReading(Vec<(Component, ServiceState)>);

impl PartialReading {
    pub fn new() -> Self {
        PartialReading(Vec::new())
    }

    pub fn push(&mut self, component: Component, state: ServiceState) {
        self.0.push((component, state));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Component, ServiceState)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last reported state for a component, if the reading saw it.
    pub fn get(&self, component: Component) -> Option<ServiceState> {
        self.0
            .iter()
            .rev()
            .find(|(c, _)| *c == component)
            .map(|&(_, s)| s)
    }
}

impl FromIterator<(Component, ServiceState)> for PartialReading {
    fn from_iter<T: IntoIterator<Item = (Component, ServiceState)>>(iter: T) -> Self {
        PartialReading(iter.into_iter().collect())
    }
}

/// One entry from the upstream incident feed.
///
/// Immutable once constructed; novelty is decided by [Incident::id] alone.
/// The description may carry HTML, which is the notifier's problem, not the
/// pipeline's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: Option<Url>,
    pub affected: Vec<String>,
    pub status: Option<ServiceState>,
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_from_label() {
        assert_eq!(Component::from_label("RSI Platform"), Some(Component::Platform));
        assert_eq!(
            Component::from_label("Star Citizen (Persistent Universe)"),
            Some(Component::PersistentUniverse)
        );
        assert_eq!(
            Component::from_label("Arena Commander"),
            Some(Component::ElectronicAccess)
        );
        assert_eq!(Component::from_label("Spectrum"), None);
    }

    #[test]
    fn test_state_wire_round_trip() {
        for state in [
            ServiceState::Operational,
            ServiceState::Degraded,
            ServiceState::Partial,
            ServiceState::Major,
            ServiceState::Maintenance,
            ServiceState::Unknown,
        ] {
            assert_eq!(ServiceState::from_wire(state.as_str()), state);
        }

        assert_eq!(ServiceState::from_wire("on fire"), ServiceState::Unknown);
    }

    #[test]
    fn test_merge_keeps_unmentioned_components() {
        let mut snapshot = StatusSnapshot {
            platform: ServiceState::Operational,
            persistent_universe: ServiceState::Degraded,
            electronic_access: ServiceState::Operational,
        };

        let reading: PartialReading =
            [(Component::Platform, ServiceState::Major)].into_iter().collect();

        assert!(snapshot.merge(&reading));
        assert_eq!(
            snapshot,
            StatusSnapshot {
                platform: ServiceState::Major,
                persistent_universe: ServiceState::Degraded,
                electronic_access: ServiceState::Operational,
            }
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut snapshot = StatusSnapshot::default();

        let reading: PartialReading = [
            (Component::Platform, ServiceState::Operational),
            (Component::PersistentUniverse, ServiceState::Partial),
        ]
        .into_iter()
        .collect();

        assert!(snapshot.merge(&reading));
        assert!(!snapshot.merge(&reading));
    }

    #[test]
    fn test_incident_json_round_trip() {
        let incident = Incident {
            id: "tag:status.example.com,2024:Incident/123".into(),
            title: "Major Outage".into(),
            description: "<p>[2024-10-26 Updates]</p><p>12:00 UTC - Investigating</p>".into(),
            link: Some(Url::parse("https://status.example.com/incidents/123").unwrap()),
            affected: vec!["Persistent Universe".into()],
            status: Some(ServiceState::Major),
            observed_at: Utc::now(),
        };

        let encoded = serde_json::to_string(&incident).unwrap();
        let decoded: Incident = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, incident);
    }
}
