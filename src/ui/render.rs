//! Dashboard rendering
//!
//! Layout:
//! - header: run state, mode, interval, latency, counters, build
//! - map canvas with incident circles | verified list over the intel feed
//! - timeline | console
//! - popup for the reset confirmation or a pending notification

use crate::domain::log_line::{ConsoleLevel, TimelineStage};
use crate::services::dashboard::{CardTone, Dashboard};
use crate::ui::input::UiState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Map, MapResolution},
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};

const KEY_HELP: &str =
    " space start/stop · +/- interval · m mode · r resync · j/k select · enter focus · x reset · q quit ";

pub fn draw(f: &mut Frame, dashboard: &Dashboard, ui: &UiState, build: &str) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),        // Header
            Constraint::Min(12),          // Map + side panels
            Constraint::Percentage(30),   // Timeline + console
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], dashboard, build);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    draw_map(f, middle[0], dashboard);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(middle[1]);

    draw_verified(f, side[0], dashboard);
    draw_intel(f, side[1], dashboard);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_chunks[2]);

    draw_timeline(f, bottom[0], dashboard);
    draw_console(f, bottom[1], dashboard);

    if ui.confirm_reset {
        draw_popup(
            f,
            " Reset ",
            "Reset the backend and clear all incidents? (y/n)",
            Color::Yellow,
        );
    } else if let Some(message) = dashboard.notification() {
        draw_popup(f, " Notice ", &format!("{}\n\npress c to dismiss", message), Color::Green);
    }
}

fn draw_header(f: &mut Frame, area: Rect, dashboard: &Dashboard, build: &str) {
    let (run_text, run_color) =
        if dashboard.running() { ("RUNNING", Color::Green) } else { ("PAUSED", Color::Yellow) };
    let mode = if dashboard.mock_mode() { "MOCK" } else { "LIVE" };
    let latency = dashboard
        .latency_ms()
        .map(|ms| format!("{}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    let counters = dashboard.counters();

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Aura Watch ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(run_text, Style::default().fg(run_color)),
        Span::raw(" | "),
        Span::styled(mode, Style::default().fg(Color::Magenta)),
        Span::raw(format!(" | Every {}ms | Latency: ", dashboard.interval_ms())),
        Span::raw(latency),
        Span::raw(" | Verified: "),
        Span::styled(format!("{}", counters.verified), Style::default().fg(Color::Green)),
        Span::raw(" Incidents: "),
        Span::styled(format!("{}", counters.incidents), Style::default().fg(Color::Yellow)),
        Span::raw(" Zones: "),
        Span::styled(format!("{}", counters.active_zones), Style::default().fg(Color::Red)),
        Span::styled(format!(" | {}", build), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL).title_bottom(KEY_HELP));

    f.render_widget(header, area);
}

fn draw_map(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let view = dashboard.map();
    let (x_bounds, y_bounds) = view.bounds();
    let radius = (x_bounds[1] - x_bounds[0]) / 120.0;
    let markers = dashboard.markers();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(
                    " Map {} z{} ",
                    view.center.display(),
                    view.zoom
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map { resolution: MapResolution::High, color: Color::DarkGray });
            ctx.layer();
            for marker in markers {
                let color = if marker.critical { Color::Red } else { Color::Yellow };
                ctx.draw(&Circle {
                    x: marker.coordinates.lon,
                    y: marker.coordinates.lat,
                    radius,
                    color,
                });
            }
        });

    f.render_widget(canvas, area);
}

fn draw_verified(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let selected = dashboard.selected();
    let items: Vec<ListItem> = dashboard
        .verified()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let position = item
                .coordinates
                .map(|c| c.display())
                .unwrap_or_else(|| "no position".to_string());
            let sources = item
                .citations
                .iter()
                .map(|c| c.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            let mut lines = vec![
                Line::from(vec![
                    Span::styled("✓ ", Style::default().fg(Color::Green)),
                    Span::styled(
                        item.type_label.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(" · {} ", item.location)),
                    Span::styled(item.confidence.clone(), Style::default().fg(Color::Cyan)),
                ]),
                Line::from(Span::styled(
                    format!("  {}  {}", position, sources),
                    Style::default().fg(Color::DarkGray),
                )),
            ];

            // Links only for the selected entry
            if idx == selected {
                if let Some(coordinates) = item.coordinates {
                    lines.push(Line::from(Span::styled(
                        format!("  map: {}", coordinates.maps_link()),
                        Style::default().fg(Color::Blue),
                    )));
                }
                for citation in &item.citations {
                    lines.push(Line::from(Span::styled(
                        format!("  {}: {}", citation.label, citation.url),
                        Style::default().fg(Color::Blue),
                    )));
                }
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Verified ({}) ", dashboard.verified().len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !dashboard.verified().is_empty() {
        state.select(Some(selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_intel(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let items: Vec<ListItem> = dashboard
        .intel()
        .iter()
        .map(|card| {
            let color = match card.tone {
                CardTone::Critical => Color::Red,
                CardTone::Warning => Color::Yellow,
                CardTone::Verified => Color::Green,
                CardTone::Neutral => Color::Gray,
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(card.source.clone(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" {}", card.timestamp), Style::default().fg(Color::DarkGray)),
                ]),
                Line::from(format!("  {}", card.text)),
            ])
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Intel Feed ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(list, area);
}

fn draw_timeline(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let items: Vec<ListItem> = dashboard
        .timeline()
        .iter()
        .map(|entry| {
            let (icon, color) = match entry.stage {
                TimelineStage::Final => ("■", Color::Green),
                TimelineStage::Active => ("›", Color::Cyan),
            };
            ListItem::new(Line::from(vec![
                Span::styled(icon, Style::default().fg(color)),
                Span::raw(format!(" {}", entry.text)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Agent Timeline ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(list, area);
}

fn draw_console(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let items: Vec<ListItem> = dashboard
        .console()
        .iter()
        .map(|line| {
            let color = match line.level {
                ConsoleLevel::Info => Color::White,
                ConsoleLevel::Warn => Color::Yellow,
                ConsoleLevel::Success => Color::Green,
                ConsoleLevel::Error => Color::Red,
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", line.level.as_str()), Style::default().fg(color)),
                Span::styled(format!("{} ", line.time), Style::default().fg(Color::DarkGray)),
                Span::styled(line.message.clone(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    f.render_widget(list, area);
}

fn draw_popup(f: &mut Frame, title: &str, text: &str, color: Color) {
    let area = centered_rect(50, 20, f.area());
    let popup = Paragraph::new(text.to_string())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
