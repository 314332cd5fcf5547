//! Shared types for the incident backend contract

use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of citations shown per verified incident
pub const MAX_CITATIONS: usize = 3;

/// Newtype wrapper for incident IDs.
///
/// The backend numbers incidents with integers, but string IDs are accepted
/// as well; both normalize to the same string key so dedup works across
/// `/simulate` and `/incidents` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
pub struct IncidentId(pub String);

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for IncidentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for IncidentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for IncidentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = IncidentId;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or integer incident id")
            }

            fn visit_str<E>(self, value: &str) -> Result<IncidentId, E>
            where
                E: de::Error,
            {
                Ok(IncidentId(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<IncidentId, E>
            where
                E: de::Error,
            {
                Ok(IncidentId(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<IncidentId, E>
            where
                E: de::Error,
            {
                Ok(IncidentId(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<IncidentId, E>
            where
                E: de::Error,
            {
                Ok(IncidentId(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Geographic position, sent on the wire as `[lat, lon]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `lat, lon` with four decimals, as shown under a verified incident
    pub fn display(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    pub fn maps_link(&self) -> String {
        format!("https://google.com/maps?q={},{}&z=8", self.lat, self.lon)
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from(pair: [f64; 2]) -> Self {
        Self { lat: pair[0], lon: pair[1] }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lat, c.lon]
    }
}

/// Incident severity. Only `Critical` and `High` change how an incident is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    High,
    Other(String),
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Critical" => Severity::Critical,
            "High" => Severity::High,
            _ => Severity::Other(label),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => "Critical".to_string(),
            Severity::High => "High".to_string(),
            Severity::Other(label) => label,
        }
    }
}

/// Source citation attached to a verified incident
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceCitation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Citation resolved for display: a label and a link that is always present
#[derive(Debug, Clone, PartialEq)]
pub struct CitationLink {
    pub label: String,
    pub url: String,
}

/// Incident as reported by the backend.
///
/// `/simulate` labels the type `incident_type`, `/incidents` labels it `type`;
/// both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_type: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub location_text: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// `None` only when the field is absent; an explicit `null` reads as 0
    #[serde(default, deserialize_with = "null_confidence_is_zero")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub sources: Option<Vec<SourceCitation>>,
}

impl Incident {
    pub fn new(id: impl Into<IncidentId>, kind: &str, location: &str) -> Self {
        Self {
            id: id.into(),
            incident_type: Some(kind.to_string()),
            kind: None,
            location_text: Some(location.to_string()),
            coordinates: None,
            confidence: None,
            severity: None,
            sources: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.coordinates = Some(Coordinates::new(lat, lon));
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceCitation>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn type_label(&self) -> &str {
        self.incident_type.as_deref().or(self.kind.as_deref()).unwrap_or("Unknown")
    }

    pub fn location(&self) -> &str {
        self.location_text.as_deref().unwrap_or("")
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Some(Severity::Critical)
    }

    /// Confidence for display: `87%`, or `HIGH` when the backend sent none.
    ///
    /// Fractions are rounded to a whole percent. Larger values are already
    /// percentages and print unchanged, so `78.5` reads `78.5%`.
    pub fn confidence_label(&self) -> String {
        match self.confidence {
            Some(value) if value <= 1.0 => format!("{}%", confidence_percent(value)),
            Some(value) => format!("{}%", value),
            None => "HIGH".to_string(),
        }
    }

    /// First [`MAX_CITATIONS`] sources with label and link fallbacks applied
    pub fn citations(&self) -> Vec<CitationLink> {
        let Some(sources) = &self.sources else {
            return Vec::new();
        };

        sources
            .iter()
            .take(MAX_CITATIONS)
            .map(|src| CitationLink {
                label: src
                    .source
                    .clone()
                    .or_else(|| src.title.clone())
                    .unwrap_or_else(|| "Source".to_string()),
                url: src.url.clone().unwrap_or_else(|| self.search_link()),
            })
            .collect()
    }

    /// Web search for "<type> <location>", used when a citation carries no URL
    pub fn search_link(&self) -> String {
        let query = format!("{} {}", self.type_label(), self.location());
        match reqwest::Url::parse_with_params("https://www.google.com/search", &[("q", query)]) {
            Ok(url) => url.to_string(),
            Err(_) => "https://www.google.com/search".to_string(),
        }
    }
}

fn null_confidence_is_zero<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0)))
}

/// Normalize a confidence value to a whole percentage.
///
/// Values `<= 1` are fractions, anything larger is already a percentage.
/// The boundary is inclusive, so exactly `1` reads as 100%, never 1%.
pub fn confidence_percent(value: f64) -> u32 {
    let percent = if value <= 1.0 { value * 100.0 } else { value };
    percent.round().max(0.0) as u32
}

/// Raw intelligence that fed the latest simulation step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawIntel {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// `status` field of a `/simulate` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SimulationStatus {
    Success,
    Complete,
    /// Anything else (the backend also reports `waiting`); ignored by the client
    Other(String),
}

impl From<String> for SimulationStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "success" => SimulationStatus::Success,
            "complete" => SimulationStatus::Complete,
            _ => SimulationStatus::Other(status),
        }
    }
}

impl From<SimulationStatus> for String {
    fn from(status: SimulationStatus) -> Self {
        match status {
            SimulationStatus::Success => "success".to_string(),
            SimulationStatus::Complete => "complete".to_string(),
            SimulationStatus::Other(status) => status,
        }
    }
}

/// Body of `POST /simulate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulateRequest {
    pub mock_mode: bool,
}

/// Response of `POST /simulate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub status: SimulationStatus,
    #[serde(default)]
    pub raw_data: Option<RawIntel>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub incident: Option<Incident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SimulateResponse {
    pub fn with_status(status: SimulationStatus) -> Self {
        Self { status, raw_data: None, logs: None, incident: None, message: None }
    }
}

/// Response of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub incidents_count: usize,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub processed_count: Option<u64>,
}
