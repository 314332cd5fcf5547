//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `backend` - HTTP client for the incident simulation backend

pub mod backend;

// Re-export commonly used types
pub use backend::{Backend, BackendError, HttpBackend};
