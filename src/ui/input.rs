//! Key bindings
//!
//! Loop controls become [`Command`]s for the poll controller. Selection,
//! focus and notification dismissal only touch the view model.

use crate::infra::config::Config;
use crate::services::controller::Command;
use crate::services::dashboard::Dashboard;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    None,
    Quit,
    Send(Command),
}

/// UI-local state that never reaches the controller
#[derive(Debug, Default)]
pub struct UiState {
    /// Reset requested, waiting for `y`
    pub confirm_reset: bool,
}

pub fn handle_key(
    key: KeyEvent,
    ui: &mut UiState,
    dashboard: &mut Dashboard,
    config: &Config,
) -> InputAction {
    if ui.confirm_reset {
        ui.confirm_reset = false;
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => InputAction::Send(Command::Reset),
            _ => InputAction::None,
        };
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return InputAction::Quit;
    }

    match key.code {
        KeyCode::Char('q') => InputAction::Quit,
        KeyCode::Char(' ') => InputAction::Send(Command::Toggle),
        KeyCode::Char('+') | KeyCode::Char('=') => step_interval(dashboard, config, true),
        KeyCode::Char('-') | KeyCode::Char('_') => step_interval(dashboard, config, false),
        KeyCode::Char('m') => InputAction::Send(Command::ToggleMockMode),
        KeyCode::Char('r') => InputAction::Send(Command::Resync),
        KeyCode::Char('j') | KeyCode::Down => {
            dashboard.select_next();
            InputAction::None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            dashboard.select_prev();
            InputAction::None
        }
        KeyCode::Enter => {
            dashboard.focus_selected(config.focus_zoom());
            InputAction::None
        }
        KeyCode::Char('x') => {
            ui.confirm_reset = true;
            InputAction::None
        }
        KeyCode::Char('c') | KeyCode::Esc => {
            dashboard.dismiss_notification();
            InputAction::None
        }
        _ => InputAction::None,
    }
}

/// One step along the configured interval range; no command at the bounds
fn step_interval(dashboard: &Dashboard, config: &Config, longer: bool) -> InputAction {
    let current = dashboard.interval_ms();
    let step = config.interval_step_ms();
    let next = if longer { current.saturating_add(step) } else { current.saturating_sub(step) };
    let next = config.clamp_interval_ms(next);
    if next == current {
        return InputAction::None;
    }
    InputAction::Send(Command::SetInterval(Duration::from_millis(next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Incident;
    use crate::services::registry::RegistryChange;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup(interval_ms: u64) -> (UiState, Dashboard, Config) {
        let config = Config::default().with_interval_ms(interval_ms);
        let dashboard = Dashboard::new(&config);
        (UiState::default(), dashboard, config)
    }

    #[test]
    fn test_loop_controls_map_to_commands() {
        let (mut ui, mut dashboard, config) = setup(5000);
        let mut key = |code| handle_key(press(code), &mut ui, &mut dashboard, &config);

        assert_eq!(key(KeyCode::Char(' ')), InputAction::Send(Command::Toggle));
        assert_eq!(key(KeyCode::Char('m')), InputAction::Send(Command::ToggleMockMode));
        assert_eq!(key(KeyCode::Char('r')), InputAction::Send(Command::Resync));
        assert_eq!(key(KeyCode::Char('q')), InputAction::Quit);
    }

    #[test]
    fn test_interval_steps_within_bounds() {
        let (mut ui, mut dashboard, config) = setup(5000);
        assert_eq!(
            handle_key(press(KeyCode::Char('+')), &mut ui, &mut dashboard, &config),
            InputAction::Send(Command::SetInterval(Duration::from_millis(5500)))
        );
        assert_eq!(
            handle_key(press(KeyCode::Char('-')), &mut ui, &mut dashboard, &config),
            InputAction::Send(Command::SetInterval(Duration::from_millis(4500)))
        );

        dashboard.set_interval_ms(6000);
        assert_eq!(
            handle_key(press(KeyCode::Char('+')), &mut ui, &mut dashboard, &config),
            InputAction::None
        );
        dashboard.set_interval_ms(500);
        assert_eq!(
            handle_key(press(KeyCode::Char('-')), &mut ui, &mut dashboard, &config),
            InputAction::None
        );
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let (mut ui, mut dashboard, config) = setup(5000);

        assert_eq!(handle_key(press(KeyCode::Char('x')), &mut ui, &mut dashboard, &config), InputAction::None);
        assert!(ui.confirm_reset);
        assert_eq!(handle_key(press(KeyCode::Char('n')), &mut ui, &mut dashboard, &config), InputAction::None);
        assert!(!ui.confirm_reset);

        handle_key(press(KeyCode::Char('x')), &mut ui, &mut dashboard, &config);
        assert_eq!(
            handle_key(press(KeyCode::Char('y')), &mut ui, &mut dashboard, &config),
            InputAction::Send(Command::Reset)
        );
    }

    #[test]
    fn test_selection_and_focus_are_local() {
        let (mut ui, mut dashboard, config) = setup(5000);
        for id in 1..=2u64 {
            let incident = Incident::new(id, "Fire", "Hillside").with_coordinates(id as f64, 5.0);
            dashboard.apply(RegistryChange::VerifiedAdded(incident), config.marker_zoom());
        }

        // Newest first, and the highlight stays on the older "1"
        assert_eq!(dashboard.selected(), 1);
        assert_eq!(handle_key(press(KeyCode::Char('k')), &mut ui, &mut dashboard, &config), InputAction::None);
        assert_eq!(dashboard.selected(), 0);
        assert_eq!(handle_key(press(KeyCode::Char('j')), &mut ui, &mut dashboard, &config), InputAction::None);
        assert_eq!(dashboard.selected(), 1);
        handle_key(press(KeyCode::Enter), &mut ui, &mut dashboard, &config);
        assert_eq!(dashboard.map().zoom, config.focus_zoom());
        assert_eq!(dashboard.map().center.lat, 1.0);
    }

    #[test]
    fn test_dismiss_notification() {
        let (mut ui, mut dashboard, config) = setup(5000);
        dashboard.notify("Simulation Complete");
        handle_key(press(KeyCode::Esc), &mut ui, &mut dashboard, &config);
        assert_eq!(dashboard.notification(), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (mut ui, mut dashboard, config) = setup(5000);
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(key, &mut ui, &mut dashboard, &config), InputAction::Quit);
    }
}
