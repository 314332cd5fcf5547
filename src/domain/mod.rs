//! Domain models - backend contract types and log classification
//!
//! This module contains the canonical data types used throughout the client:
//! - `Incident` - a detected event reported by the backend
//! - `SimulateResponse` / `StatusResponse` - polling payloads
//! - `log_line` - severity and timeline classification of agent log lines

pub mod log_line;
pub mod types;

// Re-export commonly used types at module level
pub use log_line::{classify, ConsoleLevel, LogClass, TimelineStage};
pub use types::{
    confidence_percent, Coordinates, Incident, IncidentId, RawIntel, Severity, SimulateRequest,
    SimulateResponse, SimulationStatus, SourceCitation, StatusResponse,
};
