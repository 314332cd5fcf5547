//! Dashboard view model
//!
//! Everything the operator sees, held as plain data so the TUI only has to
//! draw it. Registry transitions arrive as [`RegistryChange`]s; feeds and the
//! console are appended to directly by the controller.

use crate::domain::log_line::{classify, ConsoleLevel, TimelineStage};
use crate::domain::types::{CitationLink, Coordinates, Incident, IncidentId, RawIntel, Severity};
use crate::infra::config::Config;
use crate::services::registry::{Marker, RegistryChange};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Accent of an intel card, taken from the incident it produced (if any)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTone {
    Neutral,
    Critical,
    Warning,
    Verified,
}

impl CardTone {
    fn for_incident(incident: Option<&Incident>) -> Self {
        match incident.map(|i| i.severity.as_ref()) {
            None => CardTone::Neutral,
            Some(Some(Severity::Critical)) => CardTone::Critical,
            Some(Some(Severity::High)) => CardTone::Warning,
            Some(_) => CardTone::Verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntelCard {
    pub source: String,
    pub timestamp: String,
    pub text: String,
    pub tone: CardTone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub text: String,
    pub stage: TimelineStage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub time: String,
    pub message: String,
}

/// Rendered entry of the verified incidents list
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedItem {
    pub id: IncidentId,
    pub type_label: String,
    pub location: String,
    pub confidence: String,
    pub coordinates: Option<Coordinates>,
    pub citations: Vec<CitationLink>,
}

impl VerifiedItem {
    fn from_incident(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            type_label: incident.type_label().to_string(),
            location: incident.location().to_string(),
            confidence: incident.confidence_label(),
            coordinates: incident.coordinates,
            citations: incident.citations(),
        }
    }
}

/// Map camera: center and zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

impl MapView {
    /// Visible `([lon_min, lon_max], [lat_min, lat_max])`.
    ///
    /// Zoom 2 and below show the whole world whatever the center; each level
    /// above halves the span around the center.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let levels = i32::from(self.zoom.saturating_sub(2).min(30));
        if levels == 0 {
            return ([-180.0, 180.0], [-90.0, 90.0]);
        }
        let lon_half = 180.0 / 2f64.powi(levels);
        let lat_half = lon_half / 2.0;
        (
            [self.center.lon - lon_half, self.center.lon + lon_half],
            [self.center.lat - lat_half, self.center.lat + lat_half],
        )
    }
}

/// Counter tiles. The resync keeps all three equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub verified: usize,
    pub incidents: usize,
    pub active_zones: usize,
}

#[derive(Debug)]
pub struct Dashboard {
    intel_cap: usize,
    intel: VecDeque<IntelCard>,
    timeline: VecDeque<TimelineEntry>,
    console: VecDeque<ConsoleLine>,
    verified: Vec<VerifiedItem>,
    markers: Vec<Marker>,
    map: MapView,
    counters: Counters,
    latency_ms: Option<u64>,
    running: bool,
    mock_mode: bool,
    interval_ms: u64,
    notification: Option<String>,
    notifications_raised: u64,
    selected: usize,
}

impl Dashboard {
    pub fn new(config: &Config) -> Self {
        Self {
            intel_cap: config.intel_feed_cap(),
            intel: VecDeque::new(),
            timeline: VecDeque::new(),
            console: VecDeque::new(),
            verified: Vec::new(),
            markers: Vec::new(),
            map: MapView { center: config.map_center(), zoom: config.map_zoom() },
            counters: Counters::default(),
            latency_ms: None,
            running: false,
            mock_mode: config.mock_mode(),
            interval_ms: config.interval_ms(),
            notification: None,
            notifications_raised: 0,
            selected: 0,
        }
    }

    pub fn shared(config: &Config) -> SharedDashboard {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Prepend an intel card, evicting the oldest beyond the cap
    pub fn add_intel_card(&mut self, raw: &RawIntel, incident: Option<&Incident>) {
        let source = raw
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| "UNKNOWN".to_string());

        self.intel.push_front(IntelCard {
            source,
            timestamp: raw.timestamp.clone().unwrap_or_default(),
            text: raw.text.clone().unwrap_or_default(),
            tone: CardTone::for_incident(incident),
        });
        while self.intel.len() > self.intel_cap {
            self.intel.pop_back();
        }
    }

    /// Append agent log lines to the timeline and the console
    pub fn push_logs(&mut self, logs: &[String]) {
        for line in logs {
            let class = classify(line);
            self.timeline.push_front(TimelineEntry { text: line.clone(), stage: class.stage });
            self.log_console(class.level, line.clone());
        }
    }

    /// Prepend a console line and mirror it to tracing
    pub fn log_console(&mut self, level: ConsoleLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            ConsoleLevel::Info | ConsoleLevel::Success => {
                info!(level = %level.as_str(), "{}", message)
            }
            ConsoleLevel::Warn => warn!("{}", message),
            ConsoleLevel::Error => error!("{}", message),
        }
        self.console.push_front(ConsoleLine {
            level,
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            message,
        });
    }

    /// Apply a registry transition. New markers and list entries pan the map.
    pub fn apply(&mut self, change: RegistryChange, pan_zoom: u8) {
        match change {
            RegistryChange::MarkerAdded(marker) => {
                self.fly_to(marker.coordinates, pan_zoom);
                self.markers.push(marker);
            }
            RegistryChange::VerifiedAdded(incident) => {
                let item = VerifiedItem::from_incident(&incident);
                if let Some(coordinates) = item.coordinates {
                    self.fly_to(coordinates, pan_zoom);
                }
                // Keep the highlight on the same incident
                if !self.verified.is_empty() {
                    self.selected += 1;
                }
                self.verified.insert(0, item);
                let count = self.verified.len();
                self.set_counters(count);
            }
            RegistryChange::VerifiedRemoved(id) => {
                if let Some(index) = self.verified.iter().position(|item| item.id == id) {
                    self.verified.remove(index);
                    if index < self.selected {
                        self.selected -= 1;
                    }
                }
                self.clamp_selection();
            }
        }
    }

    pub fn apply_all(&mut self, changes: Vec<RegistryChange>, pan_zoom: u8) {
        for change in changes {
            self.apply(change, pan_zoom);
        }
    }

    /// Set all three counter tiles
    pub fn set_counters(&mut self, count: usize) {
        self.counters = Counters { verified: count, incidents: count, active_zones: count };
    }

    /// `/status` only updates the incident and active-zone tiles
    pub fn set_backend_count(&mut self, count: usize) {
        self.counters.incidents = count;
        self.counters.active_zones = count;
    }

    pub fn fly_to(&mut self, center: Coordinates, zoom: u8) {
        self.map = MapView { center, zoom };
    }

    /// Raise a blocking notification for the operator
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
        self.notifications_raised += 1;
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.verified.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.verified.len().saturating_sub(1));
    }

    pub fn selected_item(&self) -> Option<&VerifiedItem> {
        self.verified.get(self.selected)
    }

    /// Fly the map to the selected incident. Returns false if it has no position.
    pub fn focus_selected(&mut self, zoom: u8) -> bool {
        match self.selected_item().and_then(|item| item.coordinates) {
            Some(coordinates) => {
                self.fly_to(coordinates, zoom);
                true
            }
            None => false,
        }
    }

    pub fn set_latency(&mut self, latency_ms: u64) {
        self.latency_ms = Some(latency_ms);
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn set_mock_mode(&mut self, mock_mode: bool) {
        self.mock_mode = mock_mode;
    }

    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    pub fn intel(&self) -> &VecDeque<IntelCard> {
        &self.intel
    }

    pub fn timeline(&self) -> &VecDeque<TimelineEntry> {
        &self.timeline
    }

    pub fn console(&self) -> &VecDeque<ConsoleLine> {
        &self.console
    }

    pub fn verified(&self) -> &[VerifiedItem] {
        &self.verified
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn map(&self) -> MapView {
        self.map
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn notifications_raised(&self) -> u64 {
        self.notifications_raised
    }

    pub fn selected(&self) -> usize {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::IncidentRegistry;

    fn raw(n: usize) -> RawIntel {
        RawIntel {
            source: Some("twitter".to_string()),
            timestamp: Some(format!("12:00:{:02}", n)),
            text: Some(format!("report {}", n)),
        }
    }

    #[test]
    fn test_intel_feed_capped_newest_first() {
        let mut dashboard = Dashboard::new(&Config::default());
        for n in 0..25 {
            dashboard.add_intel_card(&raw(n), None);
        }
        assert_eq!(dashboard.intel().len(), 20);
        assert_eq!(dashboard.intel()[0].text, "report 24");
        assert_eq!(dashboard.intel()[19].text, "report 5");
        assert_eq!(dashboard.intel()[0].source, "TWITTER");
    }

    #[test]
    fn test_intel_cap_from_config() {
        let mut dashboard = Dashboard::new(&Config::default().with_intel_feed_cap(3));
        for n in 0..5 {
            dashboard.add_intel_card(&raw(n), None);
        }
        assert_eq!(dashboard.intel().len(), 3);
    }

    #[test]
    fn test_card_tone_and_unknown_source() {
        let mut dashboard = Dashboard::new(&Config::default());
        let critical = Incident::new(1, "Fire", "Hill").with_severity(Severity::Critical);
        let high = Incident::new(2, "Fire", "Hill").with_severity(Severity::High);
        let plain = Incident::new(3, "Fire", "Hill");

        dashboard.add_intel_card(&RawIntel::default(), Some(&critical));
        assert_eq!(dashboard.intel()[0].tone, CardTone::Critical);
        assert_eq!(dashboard.intel()[0].source, "UNKNOWN");
        dashboard.add_intel_card(&raw(1), Some(&high));
        assert_eq!(dashboard.intel()[0].tone, CardTone::Warning);
        dashboard.add_intel_card(&raw(2), Some(&plain));
        assert_eq!(dashboard.intel()[0].tone, CardTone::Verified);
        dashboard.add_intel_card(&raw(3), None);
        assert_eq!(dashboard.intel()[0].tone, CardTone::Neutral);
    }

    #[test]
    fn test_logs_feed_timeline_and_console() {
        let mut dashboard = Dashboard::new(&Config::default());
        dashboard.push_logs(&[
            "Ingesting: flood report".to_string(),
            "Verify Agent: Rejected (Low Credibility)".to_string(),
            "Action: CREATED #4".to_string(),
        ]);

        assert_eq!(dashboard.timeline().len(), 3);
        assert_eq!(dashboard.timeline()[0].stage, TimelineStage::Final);
        assert_eq!(dashboard.timeline()[2].stage, TimelineStage::Active);

        let levels: Vec<ConsoleLevel> = dashboard.console().iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![ConsoleLevel::Success, ConsoleLevel::Warn, ConsoleLevel::Info]);
    }

    #[test]
    fn test_registry_changes_pan_map_and_count() {
        let config = Config::default();
        let mut dashboard = Dashboard::new(&config);
        let mut registry = IncidentRegistry::new();

        let incident = Incident::new(1, "Flood", "Delta").with_coordinates(-12.5, 45.25);
        dashboard.apply_all(registry.record(&incident), config.marker_zoom());

        assert_eq!(dashboard.markers().len(), 1);
        assert_eq!(dashboard.verified().len(), 1);
        assert_eq!(dashboard.counters(), Counters { verified: 1, incidents: 1, active_zones: 1 });
        assert_eq!(dashboard.map().center, Coordinates::new(-12.5, 45.25));
        assert_eq!(dashboard.map().zoom, 10);

        dashboard.apply(RegistryChange::VerifiedRemoved(IncidentId::from(1)), 10);
        assert!(dashboard.verified().is_empty());
        assert_eq!(dashboard.markers().len(), 1);
    }

    #[test]
    fn test_selection_and_focus() {
        let mut dashboard = Dashboard::new(&Config::default());
        let mut registry = IncidentRegistry::new();
        dashboard.apply_all(registry.record(&Incident::new(1, "Storm", "Sea")), 10);
        dashboard.apply_all(
            registry.record(&Incident::new(2, "Flood", "Town").with_coordinates(1.0, 2.0)),
            10,
        );
        dashboard.fly_to(Coordinates::new(0.0, 0.0), 2);

        // The highlight stayed on "1", which has no position
        assert_eq!(dashboard.selected(), 1);
        assert!(!dashboard.focus_selected(12));

        dashboard.select_prev();
        dashboard.select_prev();
        assert_eq!(dashboard.selected(), 0);
        assert!(dashboard.focus_selected(12));
        assert_eq!(dashboard.map().zoom, 12);

        dashboard.apply(RegistryChange::VerifiedRemoved(IncidentId::from(1)), 10);
        assert_eq!(dashboard.selected(), 0);
    }

    #[test]
    fn test_selection_follows_incident_as_list_changes() {
        let mut dashboard = Dashboard::new(&Config::default());
        let mut registry = IncidentRegistry::new();
        for id in 1..=3 {
            dashboard.apply_all(registry.record(&Incident::new(id, "Flood", "Town")), 10);
        }
        // List is [3, 2, 1]; highlight "2"
        dashboard.select_prev();
        dashboard.select_prev();
        dashboard.select_next();
        assert_eq!(dashboard.selected_item().unwrap().id, IncidentId::from(2));

        dashboard.apply_all(registry.record(&Incident::new(4, "Fire", "Hill")), 10);
        assert_eq!(dashboard.selected_item().unwrap().id, IncidentId::from(2));

        dashboard.apply(RegistryChange::VerifiedRemoved(IncidentId::from(4)), 10);
        assert_eq!(dashboard.selected_item().unwrap().id, IncidentId::from(2));

        dashboard.apply(RegistryChange::VerifiedRemoved(IncidentId::from(1)), 10);
        assert_eq!(dashboard.selected_item().unwrap().id, IncidentId::from(2));
    }

    #[test]
    fn test_notification_counts_each_raise() {
        let mut dashboard = Dashboard::new(&Config::default());
        dashboard.notify("Simulation Complete");
        assert_eq!(dashboard.notification(), Some("Simulation Complete"));
        dashboard.dismiss_notification();
        assert!(dashboard.notification().is_none());
        assert_eq!(dashboard.notifications_raised(), 1);
    }

    #[test]
    fn test_map_bounds() {
        let world = MapView { center: Coordinates::new(20.0, 0.0), zoom: 2 };
        assert_eq!(world.bounds(), ([-180.0, 180.0], [-90.0, 90.0]));

        let close = MapView { center: Coordinates::new(0.0, 0.0), zoom: 4 };
        assert_eq!(close.bounds(), ([-45.0, 45.0], [-22.5, 22.5]));
    }
}
