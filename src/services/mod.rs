//! Services - client state and the poll loop
//!
//! This module contains the core client services:
//! - `registry` - Incident dedup and reconciliation (markers, verified list)
//! - `dashboard` - Shared view model rendered by the UI
//! - `scheduler` - Single-slot cancellable poll timer
//! - `controller` - Async poll controller driven by operator commands

pub mod controller;
pub mod dashboard;
pub mod registry;
pub mod scheduler;

// Re-export commonly used types
pub use controller::{create_controller, Command, PollController};
pub use dashboard::{Dashboard, SharedDashboard};
pub use registry::{IncidentRegistry, Marker, RegistryChange};
pub use scheduler::PollTimer;
