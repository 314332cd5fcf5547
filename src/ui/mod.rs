//! Terminal UI - key handling and dashboard rendering
//!
//! - `input` - Maps key presses to controller commands and local view actions
//! - `render` - Draws the [`Dashboard`](crate::services::Dashboard) with ratatui

pub mod input;
pub mod render;

pub use input::{handle_key, InputAction, UiState};
pub use render::draw;
