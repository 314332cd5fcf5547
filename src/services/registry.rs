//! Incident registries - which incidents have been drawn
//!
//! Pure state transitions with no rendering: every operation returns the
//! [`RegistryChange`]s it caused so a renderer can apply them.
//!
//! Two registries are kept:
//! - markers: one per incident id that carries coordinates; only ever grow
//! - verified list: one entry per incident id, newest first; the full
//!   reconciliation pass removes ids missing from the backend's set
//!
//! Markers are deliberately not reconciled, so a merged-away incident keeps
//! its map marker until reload while its list entry disappears.

use crate::domain::types::{Coordinates, Incident, IncidentId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Map marker for an incident
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: IncidentId,
    pub coordinates: Coordinates,
    pub critical: bool,
    pub label: String,
}

impl Marker {
    fn from_incident(incident: &Incident, coordinates: Coordinates) -> Self {
        Self {
            id: incident.id.clone(),
            coordinates,
            critical: incident.is_critical(),
            label: format!("{} · {}", incident.type_label(), incident.location()),
        }
    }
}

/// A single registry transition
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    MarkerAdded(Marker),
    VerifiedAdded(Incident),
    VerifiedRemoved(IncidentId),
}

/// Result of a full reconciliation against the backend's incident set
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub changes: Vec<RegistryChange>,
    /// Size of the authoritative set; all counters are set to this
    pub count: usize,
}

impl Reconciliation {
    pub fn removed(&self) -> usize {
        self.changes.iter().filter(|c| matches!(c, RegistryChange::VerifiedRemoved(_))).count()
    }

    pub fn added(&self) -> usize {
        self.changes.iter().filter(|c| matches!(c, RegistryChange::VerifiedAdded(_))).count()
    }
}

#[derive(Debug, Default)]
pub struct IncidentRegistry {
    markers: FxHashMap<IncidentId, Marker>,
    /// Verified ids, newest first
    verified: Vec<IncidentId>,
    verified_set: FxHashSet<IncidentId>,
}

impl IncidentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a map marker on first sighting of an id with coordinates
    pub fn add_marker(&mut self, incident: &Incident) -> Option<RegistryChange> {
        let coordinates = incident.coordinates?;
        if self.markers.contains_key(&incident.id) {
            return None;
        }
        let marker = Marker::from_incident(incident, coordinates);
        self.markers.insert(incident.id.clone(), marker.clone());
        Some(RegistryChange::MarkerAdded(marker))
    }

    /// Register a verified-list entry on first sighting of an id
    pub fn add_verified(&mut self, incident: &Incident) -> Option<RegistryChange> {
        if !self.verified_set.insert(incident.id.clone()) {
            return None;
        }
        self.verified.insert(0, incident.id.clone());
        Some(RegistryChange::VerifiedAdded(incident.clone()))
    }

    /// Marker then verified entry, as done for every delivered incident
    pub fn record(&mut self, incident: &Incident) -> Vec<RegistryChange> {
        self.add_marker(incident).into_iter().chain(self.add_verified(incident)).collect()
    }

    /// Reconcile the verified list against the backend's full incident set.
    ///
    /// Unseen incidents are recorded in order, then verified entries whose id
    /// is absent from `incidents` are removed. Markers are never removed.
    pub fn reconcile(&mut self, incidents: &[Incident]) -> Reconciliation {
        let mut changes = Vec::new();
        for incident in incidents {
            changes.extend(self.record(incident));
        }

        let valid: FxHashSet<&IncidentId> = incidents.iter().map(|i| &i.id).collect();
        let (keep, stale): (Vec<IncidentId>, Vec<IncidentId>) =
            self.verified.drain(..).partition(|id| valid.contains(id));
        self.verified = keep;
        for id in stale {
            self.verified_set.remove(&id);
            changes.push(RegistryChange::VerifiedRemoved(id));
        }

        Reconciliation { changes, count: incidents.len() }
    }

    pub fn has_marker(&self, id: &IncidentId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn has_verified(&self, id: &IncidentId) -> bool {
        self.verified_set.contains(id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    /// Verified ids, newest first
    pub fn verified_ids(&self) -> &[IncidentId] {
        &self.verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;

    fn incident(id: u64) -> Incident {
        Incident::new(id, "Flood", "Riverside").with_coordinates(10.0 + id as f64, 20.0)
    }

    #[test]
    fn test_record_is_deduplicated() {
        let mut registry = IncidentRegistry::new();
        let first = registry.record(&incident(1));
        assert_eq!(first.len(), 2);
        assert!(matches!(first[0], RegistryChange::MarkerAdded(_)));
        assert!(matches!(first[1], RegistryChange::VerifiedAdded(_)));

        assert!(registry.record(&incident(1)).is_empty());
        assert_eq!(registry.marker_count(), 1);
        assert_eq!(registry.verified_count(), 1);
    }

    #[test]
    fn test_incident_without_coordinates_gets_no_marker() {
        let mut registry = IncidentRegistry::new();
        let changes = registry.record(&Incident::new(5, "Storm", "Unknown"));
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], RegistryChange::VerifiedAdded(_)));
        assert!(!registry.has_marker(&IncidentId::from(5)));
        assert!(registry.has_verified(&IncidentId::from(5)));
    }

    #[test]
    fn test_verified_ids_newest_first() {
        let mut registry = IncidentRegistry::new();
        registry.record(&incident(1));
        registry.record(&incident(2));
        registry.record(&incident(3));
        let ids: Vec<String> = registry.verified_ids().iter().map(|i| i.0.clone()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_reconcile_removes_stale_list_entries_only() {
        let mut registry = IncidentRegistry::new();
        registry.record(&incident(1));
        registry.record(&incident(2));

        let rec = registry.reconcile(&[incident(2), incident(3)]);
        assert_eq!(rec.count, 2);
        assert_eq!(rec.added(), 1);
        assert_eq!(rec.removed(), 1);
        assert!(rec.changes.contains(&RegistryChange::VerifiedRemoved(IncidentId::from(1))));

        assert!(!registry.has_verified(&IncidentId::from(1)));
        assert!(registry.has_verified(&IncidentId::from(3)));
        // Markers are not reconciled
        assert!(registry.has_marker(&IncidentId::from(1)));
        assert_eq!(registry.marker_count(), 3);
    }

    #[test]
    fn test_removed_id_can_be_added_again() {
        let mut registry = IncidentRegistry::new();
        registry.record(&incident(1));
        registry.reconcile(&[]);
        assert_eq!(registry.verified_count(), 0);

        let changes = registry.record(&incident(1));
        // Marker survived, so only the list entry comes back
        assert_eq!(changes.len(), 1);
        assert!(registry.has_verified(&IncidentId::from(1)));
    }

    #[test]
    fn test_marker_carries_severity() {
        let mut registry = IncidentRegistry::new();
        let critical = incident(8).with_severity(Severity::Critical);
        match registry.add_marker(&critical) {
            Some(RegistryChange::MarkerAdded(marker)) => {
                assert!(marker.critical);
                assert_eq!(marker.label, "Flood · Riverside");
            }
            other => panic!("unexpected change: {:?}", other),
        }
    }
}
