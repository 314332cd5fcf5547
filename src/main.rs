//! Aura watch - terminal client for the incident simulation backend
//!
//! Polls the backend on a fixed cadence, draws incidents on a world map and
//! keeps the verified list consistent with the backend's incident set.
//!
//! Module structure:
//! - `domain/` - Wire types and log line classification
//! - `io/` - Backend HTTP client
//! - `services/` - Registry, dashboard view model, poll controller
//! - `infra/` - Config and metrics
//! - `ui/` - Key bindings and ratatui rendering

use aura_watch::infra::{Config, Metrics};
use aura_watch::io::HttpBackend;
use aura_watch::services::{create_controller, Command, Dashboard, SharedDashboard};
use aura_watch::ui::{draw, handle_key, InputAction, UiState};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Aura watch - incident monitoring dashboard
#[derive(Parser, Debug)]
#[command(name = "aura-watch", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Backend base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Poll interval in milliseconds (clamped to the configured range)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Run without the TUI and log to stdout
    #[arg(long)]
    headless: bool,

    /// Request live data instead of mock data
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path);
    if let Some(url) = args.api_url {
        config = config.with_api_url(url);
    }
    if let Some(ms) = args.interval_ms {
        let ms = config.clamp_interval_ms(ms);
        config = config.with_interval_ms(ms);
    }
    if args.live {
        config = config.with_mock_mode(false);
    }

    init_tracing(&config, args.headless)?;

    info!(
        config_file = %config.config_file(),
        api_url = %config.api_url(),
        interval_ms = %config.interval_ms(),
        mock_mode = %config.mock_mode(),
        headless = %args.headless,
        git_hash = %env!("GIT_HASH"),
        "config_loaded"
    );

    let backend = Arc::new(HttpBackend::new(&config)?);
    let dashboard = Dashboard::shared(&config);
    let metrics = Arc::new(Metrics::new());

    // Start metrics reporter (if interval > 0)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
            interval.tick().await;
            loop {
                interval.tick().await;
                metrics_clone.report().log();
            }
        });
    }

    let (cmd_tx, controller) =
        create_controller(config.clone(), backend, dashboard.clone(), metrics.clone(), 64);
    let completions = controller.subscribe_completions();
    let controller_handle = tokio::spawn(controller.run());

    let result = if args.headless {
        run_headless(&cmd_tx, completions).await
    } else {
        run_tui(&config, &dashboard, &cmd_tx).await
    };

    // Controller exits on shutdown; an error above still stops it
    let _ = cmd_tx.send(Command::Shutdown).await;
    controller_handle.await?;

    metrics.report().log();
    info!("aura-watch shutdown complete");
    result
}

fn init_tracing(config: &Config, headless: bool) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    // The TUI owns the terminal, so logs go to a file there
    let writer = if headless {
        BoxMakeWriter::new(io::stdout)
    } else {
        let file = OpenOptions::new().create(true).append(true).open(config.log_file())?;
        BoxMakeWriter::new(Mutex::new(file))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(headless)
        .with_writer(writer);

    if config.log_json() {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Start immediately and run until the backend reports completion or Ctrl+C
async fn run_headless(
    cmd_tx: &mpsc::Sender<Command>,
    mut completions: watch::Receiver<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    cmd_tx.send(Command::Start).await?;

    tokio::select! {
        changed = completions.changed() => {
            if changed.is_ok() {
                info!("headless_run_complete");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown_signal_received");
        }
    }

    Ok(())
}

async fn run_tui(
    config: &Config,
    dashboard: &SharedDashboard,
    cmd_tx: &mpsc::Sender<Command>,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, config, dashboard, cmd_tx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
    dashboard: &SharedDashboard,
    cmd_tx: &mpsc::Sender<Command>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);
    let build = format!("build {}", env!("GIT_HASH"));
    let mut ui = UiState::default();

    loop {
        {
            let d = dashboard.lock();
            terminal.draw(|f| draw(f, &d, &ui, &build))?;
        }

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let action = handle_key(key, &mut ui, &mut dashboard.lock(), config);
                    match action {
                        InputAction::Quit => return Ok(()),
                        InputAction::Send(cmd) => cmd_tx.send(cmd).await?,
                        InputAction::None => {}
                    }
                }
            }
        }
    }
}
