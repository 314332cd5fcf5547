//! Poll controller - drives the simulation loop against the backend
//!
//! One task owns all session state and multiplexes three sources with
//! `tokio::select!`:
//! - operator commands from an mpsc channel
//! - the single-slot [`PollTimer`]
//! - the one in-flight poll cycle
//! - the one in-flight operator request (resync or reset)
//!
//! Scheduling is settle-then-wait: the next cycle is armed `interval` after
//! the previous one finished, so cadence = interval + request latency.
//! Cycles never overlap. `stop()` only cancels the pending timer; a cycle
//! already in flight completes and its results are still rendered. A cycle
//! that delivered an incident also waits for its follow-up resync before the
//! next one is armed.

use crate::domain::log_line::ConsoleLevel;
use crate::domain::types::{Incident, SimulateResponse, SimulationStatus, StatusResponse};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::backend::{Backend, BackendError};
use crate::services::dashboard::{Dashboard, SharedDashboard};
use crate::services::registry::IncidentRegistry;
use crate::services::scheduler::PollTimer;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub const COMPLETE_NOTIFICATION: &str = "Simulation Complete";

/// Operator commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    /// Start if stopped, stop if running
    Toggle,
    SetInterval(Duration),
    SetMockMode(bool),
    ToggleMockMode,
    /// Out-of-cycle full resync
    Resync,
    /// Reset the backend and reload local state (already confirmed by the operator)
    Reset,
    Shutdown,
}

/// Transient session state, discarded on reload
#[derive(Debug, Clone)]
pub struct SessionState {
    pub running: bool,
    pub interval: Duration,
    pub mock_mode: bool,
}

impl SessionState {
    fn new(config: &Config) -> Self {
        Self { running: false, interval: config.interval(), mock_mode: config.mock_mode() }
    }
}

/// Outcome of a full resync: `/status` then `/incidents`
pub struct ResyncOutcome {
    pub status: Result<StatusResponse, BackendError>,
    pub incidents: Result<Vec<Incident>, BackendError>,
}

async fn fetch_resync(backend: Arc<dyn Backend>) -> ResyncOutcome {
    let status = backend.status().await;
    let incidents = backend.incidents().await;
    ResyncOutcome { status, incidents }
}

/// Stage of the in-flight poll cycle
enum CycleStage {
    Simulate { started: Instant, request: BoxFuture<Result<SimulateResponse, BackendError>> },
    Resync(BoxFuture<ResyncOutcome>),
}

enum StageDone {
    Simulated { result: Result<SimulateResponse, BackendError>, latency: Duration },
    Resynced(ResyncOutcome),
}

/// Slot for the one poll cycle allowed in flight
#[derive(Default)]
struct InFlight {
    stage: Option<CycleStage>,
}

impl InFlight {
    fn is_active(&self) -> bool {
        self.stage.is_some()
    }

    fn set(&mut self, stage: CycleStage) {
        self.stage = Some(stage);
    }

    fn abandon(&mut self) -> bool {
        self.stage.take().is_some()
    }

    /// Resolve when the current stage completes, emptying the slot.
    /// Cancel-safe: the request future stays in the slot until it resolves.
    async fn next(&mut self) -> StageDone {
        let done = match self.stage.as_mut() {
            Some(CycleStage::Simulate { started, request }) => {
                let result = request.await;
                StageDone::Simulated { result, latency: started.elapsed() }
            }
            Some(CycleStage::Resync(resync)) => StageDone::Resynced(resync.await),
            None => pending().await,
        };
        self.stage = None;
        done
    }
}

enum OperatorDone {
    Resynced(ResyncOutcome),
    Reset(Result<(), BackendError>),
}

/// Slot for an operator-requested resync or reset.
/// Polled alongside the cycle so neither holds up the other.
#[derive(Default)]
struct OperatorRequest {
    pending: Option<BoxFuture<OperatorDone>>,
}

impl OperatorRequest {
    fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    fn set(&mut self, request: BoxFuture<OperatorDone>) -> bool {
        self.pending.replace(request).is_some()
    }

    async fn next(&mut self) -> OperatorDone {
        let done = match self.pending.as_mut() {
            Some(request) => request.await,
            None => pending().await,
        };
        self.pending = None;
        done
    }
}

enum Event {
    Command(Option<Command>),
    TimerFired,
    Stage(StageDone),
    Operator(OperatorDone),
}

pub struct PollController {
    config: Config,
    backend: Arc<dyn Backend>,
    dashboard: SharedDashboard,
    metrics: Arc<Metrics>,
    session: SessionState,
    registry: IncidentRegistry,
    timer: PollTimer,
    cycle: InFlight,
    operator: OperatorRequest,
    completions: watch::Sender<u64>,
    cmd_rx: mpsc::Receiver<Command>,
}

impl PollController {
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        dashboard: SharedDashboard,
        metrics: Arc<Metrics>,
        cmd_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let (completions, _) = watch::channel(0);
        let session = SessionState::new(&config);
        Self {
            config,
            backend,
            dashboard,
            metrics,
            session,
            registry: IncidentRegistry::new(),
            timer: PollTimer::new(),
            cycle: InFlight::default(),
            operator: OperatorRequest::default(),
            completions,
            cmd_rx,
        }
    }

    /// Count of "complete" statuses seen, for callers that exit on completion
    pub fn subscribe_completions(&self) -> watch::Receiver<u64> {
        self.completions.subscribe()
    }

    /// Load the backend's current state, then serve commands until shutdown
    pub async fn run(mut self) {
        info!(api_url = %self.config.api_url(), "poll_controller_started");
        self.sync().await;

        loop {
            let event = tokio::select! {
                cmd = self.cmd_rx.recv() => Event::Command(cmd),
                _ = self.timer.fired() => Event::TimerFired,
                done = self.cycle.next() => Event::Stage(done),
                done = self.operator.next() => Event::Operator(done),
            };

            match event {
                Event::Command(None) | Event::Command(Some(Command::Shutdown)) => break,
                Event::Command(Some(cmd)) => self.handle_command(cmd),
                Event::TimerFired => self.begin_cycle(),
                Event::Stage(StageDone::Simulated { result, latency }) => {
                    self.on_simulated(result, latency)
                }
                Event::Stage(StageDone::Resynced(outcome)) => {
                    self.apply_resync(outcome);
                    self.finish_cycle();
                }
                Event::Operator(OperatorDone::Resynced(outcome)) => self.apply_resync(outcome),
                Event::Operator(OperatorDone::Reset(result)) => self.on_reset(result).await,
            }
        }

        self.timer.cancel();
        info!("poll_controller_stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        debug!(command = ?cmd, "command_received");
        match cmd {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Toggle => {
                if self.session.running {
                    self.stop();
                } else {
                    self.start();
                }
            }
            Command::SetInterval(interval) => self.set_interval(interval),
            Command::SetMockMode(mock_mode) => self.set_mock_mode(mock_mode),
            Command::ToggleMockMode => self.set_mock_mode(!self.session.mock_mode),
            Command::Resync => self.request_resync(),
            Command::Reset => self.request_reset(),
            Command::Shutdown => {}
        }
    }

    /// Start the loop and run one cycle immediately. No-op if already running.
    pub fn start(&mut self) {
        if self.session.running {
            return;
        }
        self.session.running = true;
        {
            let mut dashboard = self.dashboard.lock();
            dashboard.set_running(true);
            dashboard.log_console(ConsoleLevel::Info, "Simulation sequence initiated.");
        }
        self.begin_cycle();
    }

    /// Stop scheduling. An in-flight cycle still completes and renders.
    pub fn stop(&mut self) {
        self.session.running = false;
        if self.timer.cancel() {
            debug!("pending_cycle_cancelled");
        }
        let mut dashboard = self.dashboard.lock();
        dashboard.set_running(false);
        dashboard.log_console(ConsoleLevel::Warn, "Simulation paused by user.");
    }

    /// Change the interval; a running loop restarts so it takes effect next cycle
    pub fn set_interval(&mut self, interval: Duration) {
        self.session.interval = interval;
        self.dashboard.lock().set_interval_ms(interval.as_millis() as u64);
        info!(interval_ms = %interval.as_millis(), "poll_interval_changed");
        if self.session.running {
            self.stop();
            self.start();
        }
    }

    pub fn set_mock_mode(&mut self, mock_mode: bool) {
        self.session.mock_mode = mock_mode;
        self.dashboard.lock().set_mock_mode(mock_mode);
        info!(mock_mode = %mock_mode, "mock_mode_changed");
    }

    /// Launch a poll cycle unless stopped or one is already in flight
    fn begin_cycle(&mut self) {
        if !self.session.running {
            return;
        }
        if self.cycle.is_active() {
            debug!("poll_cycle_skipped_in_flight");
            return;
        }

        let backend = Arc::clone(&self.backend);
        let mock_mode = self.session.mock_mode;
        self.cycle.set(CycleStage::Simulate {
            started: Instant::now(),
            request: Box::pin(async move { backend.simulate(mock_mode).await }),
        });
    }

    fn on_simulated(&mut self, result: Result<SimulateResponse, BackendError>, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;

        match result {
            Ok(response) => {
                self.metrics.record_cycle(latency_ms);
                self.dashboard.lock().set_latency(latency_ms);

                match response.status {
                    SimulationStatus::Success => {
                        debug!(latency_ms = %latency_ms, "poll_cycle_success");
                        if let Some(incident) = self.render_success(response) {
                            // The cycle stays in flight until the resync lands
                            self.begin_resync_stage(&incident);
                            return;
                        }
                    }
                    SimulationStatus::Complete => {
                        self.complete();
                        return;
                    }
                    SimulationStatus::Other(status) => {
                        debug!(status = %status, message = ?response.message, "simulate_status_ignored");
                    }
                }
            }
            Err(e) => {
                self.metrics.record_cycle_failure();
                error!(error = %e, latency_ms = %latency_ms, "poll_cycle_error");
                self.dashboard.lock().log_console(ConsoleLevel::Error, format!("API Error: {}", e));
            }
        }

        self.finish_cycle();
    }

    /// Render intel, logs and the incident. Returns the incident if one arrived.
    fn render_success(&mut self, response: SimulateResponse) -> Option<Incident> {
        let mut dashboard = self.dashboard.lock();

        if let Some(raw) = &response.raw_data {
            dashboard.add_intel_card(raw, response.incident.as_ref());
        }
        if let Some(logs) = &response.logs {
            dashboard.push_logs(logs);
        }

        let incident = response.incident?;
        self.metrics.record_incident();
        let changes = self.registry.record(&incident);
        dashboard.apply_all(changes, self.config.marker_zoom());
        info!(incident_id = %incident.id, incident_type = %incident.type_label(), "incident_received");
        Some(incident)
    }

    fn begin_resync_stage(&mut self, incident: &Incident) {
        debug!(incident_id = %incident.id, "resync_after_incident");
        let backend = Arc::clone(&self.backend);
        self.cycle.set(CycleStage::Resync(Box::pin(fetch_resync(backend))));
    }

    /// Terminal status: stop, notify once, schedule nothing
    fn complete(&mut self) {
        self.stop();
        self.dashboard.lock().notify(COMPLETE_NOTIFICATION);
        self.completions.send_modify(|n| *n += 1);
        info!("simulation_complete");
    }

    /// End of a cycle: arm the next one if still running
    fn finish_cycle(&mut self) {
        if self.session.running {
            self.timer.schedule(self.session.interval);
        }
    }

    /// Full resync outside the poll cycle (startup, reload)
    pub async fn sync(&mut self) {
        let outcome = fetch_resync(Arc::clone(&self.backend)).await;
        self.apply_resync(outcome);
    }

    fn apply_resync(&mut self, outcome: ResyncOutcome) {
        match outcome.status {
            Ok(status) => {
                self.dashboard.lock().set_backend_count(status.incidents_count);
            }
            Err(e) => warn!(error = %e, "status_fetch_failed"),
        }

        match outcome.incidents {
            Ok(incidents) => {
                let reconciliation = self.registry.reconcile(&incidents);
                let (added, removed) = (reconciliation.added(), reconciliation.removed());
                {
                    let mut dashboard = self.dashboard.lock();
                    dashboard.apply_all(reconciliation.changes, self.config.marker_zoom());
                    dashboard.set_counters(reconciliation.count);
                }
                self.metrics.record_resync(true);
                info!(
                    incidents = %reconciliation.count,
                    added = %added,
                    removed = %removed,
                    "resync_complete"
                );
            }
            Err(e) => {
                self.metrics.record_resync(false);
                error!(error = %e, "incidents_fetch_failed");
            }
        }
    }

    /// Operator resync, skipped while another operator request is pending
    fn request_resync(&mut self) {
        if self.operator.is_active() {
            debug!("resync_skipped_request_pending");
            return;
        }
        let backend = Arc::clone(&self.backend);
        self.operator.set(Box::pin(async move {
            OperatorDone::Resynced(fetch_resync(backend).await)
        }));
    }

    /// Ask the backend to reset. Supersedes a pending operator resync.
    fn request_reset(&mut self) {
        let backend = Arc::clone(&self.backend);
        let superseded =
            self.operator.set(Box::pin(async move { OperatorDone::Reset(backend.reset().await) }));
        if superseded {
            debug!("operator_request_superseded_by_reset");
        }
    }

    /// Any backend reply reloads; only an unreachable backend keeps local state
    async fn on_reset(&mut self, result: Result<(), BackendError>) {
        match result {
            Ok(()) => {
                info!("backend_reset");
                self.reload().await;
            }
            Err(e) => {
                error!(error = %e, "backend_reset_failed");
                self.dashboard
                    .lock()
                    .log_console(ConsoleLevel::Error, format!("Reset failed: {}", e));
            }
        }
    }

    async fn reload(&mut self) {
        self.timer.cancel();
        if self.cycle.abandon() {
            debug!("in_flight_cycle_abandoned");
        }
        self.session = SessionState::new(&self.config);
        self.registry = IncidentRegistry::new();
        *self.dashboard.lock() = Dashboard::new(&self.config);
        info!("session_reloaded");
        self.sync().await;
    }
}

/// Create a command channel and controller
///
/// Returns the sender (for the UI) and the controller (to be spawned)
pub fn create_controller(
    config: Config,
    backend: Arc<dyn Backend>,
    dashboard: SharedDashboard,
    metrics: Arc<Metrics>,
    buffer_size: usize,
) -> (mpsc::Sender<Command>, PollController) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer_size);
    let controller = PollController::new(config, backend, dashboard, metrics, cmd_rx);
    (cmd_tx, controller)
}
