//! Mock incident simulation backend
//!
//! Serves the HTTP contract the client polls, backed by canned reports so the
//! dashboard can be exercised without the real agent pipeline.
//!
//! Endpoints:
//! - `GET /status` → `{ status, incidents_count, processed_count }`
//! - `GET /incidents` → incident store, type under `type`
//! - `POST /simulate` `{ mock_mode }` → one processing step
//! - `POST /reset` → clears the store
//!
//! Each step takes the next canned report: it either creates an incident,
//! merges into an earlier one (replacing its id) or is rejected. After
//! `--complete-after` steps every call answers `complete`. Live mode has no
//! feed here and answers `waiting`.
//!
//! Usage:
//!   cargo run --bin mock_aura -- --port 8000 --complete-after 12 --latency-ms 300

use aura_watch::domain::types::{
    Incident, IncidentId, RawIntel, Severity, SimulateRequest, SimulateResponse, SimulationStatus,
    SourceCitation, StatusResponse,
};
use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock_aura")]
#[command(about = "Mock incident simulation backend for local runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Answer `complete` after this many steps (0 = never)
    #[arg(long, default_value = "12")]
    complete_after: u64,

    /// Artificial processing delay for /simulate (ms)
    #[arg(long, default_value = "300")]
    latency_ms: u64,

    /// Fail every Nth /simulate with HTTP 500 (0 = never)
    #[arg(long, default_value = "0")]
    fail_every: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Create,
    /// Consolidate with the newest incident of the same type
    Merge,
    Reject,
}

struct Report {
    source: &'static str,
    text: &'static str,
    kind: &'static str,
    location: &'static str,
    lat: f64,
    lon: f64,
    severity: &'static str,
    confidence: f64,
    outcome: Outcome,
}

const REPORTS: &[Report] = &[
    Report {
        source: "twitter",
        text: "Massive flooding on the riverside, water up to the first floor",
        kind: "Flood",
        location: "Chennai, India",
        lat: 13.0827,
        lon: 80.2707,
        severity: "Critical",
        confidence: 0.91,
        outcome: Outcome::Create,
    },
    Report {
        source: "reddit",
        text: "Strong shaking felt downtown, buildings evacuated",
        kind: "Earthquake",
        location: "Izmir, Turkey",
        lat: 38.4237,
        lon: 27.1428,
        severity: "High",
        confidence: 0.84,
        outcome: Outcome::Create,
    },
    Report {
        source: "facebook",
        text: "Anyone else see the lights in the sky?",
        kind: "Other",
        location: "Unknown",
        lat: 0.0,
        lon: 0.0,
        severity: "Low",
        confidence: 0.2,
        outcome: Outcome::Reject,
    },
    Report {
        source: "news",
        text: "Evacuation ordered as wildfire jumps the highway",
        kind: "Wildfire",
        location: "Santa Rosa, USA",
        lat: 38.4404,
        lon: -122.7141,
        severity: "Critical",
        confidence: 1.0,
        outcome: Outcome::Create,
    },
    Report {
        source: "twitter",
        text: "Flood water still rising near the central station",
        kind: "Flood",
        location: "Chennai Central, India",
        lat: 13.0827,
        lon: 80.2750,
        severity: "Critical",
        confidence: 0.95,
        outcome: Outcome::Merge,
    },
    Report {
        source: "radio",
        text: "Landslide blocking the mountain pass road",
        kind: "Landslide",
        location: "Kathmandu, Nepal",
        lat: 27.7172,
        lon: 85.324,
        severity: "High",
        confidence: 78.0,
        outcome: Outcome::Create,
    },
];

#[derive(Debug, Default)]
struct MockState {
    processed: u64,
    calls: u64,
    next_id: u64,
    /// Store order, oldest first
    incidents: Vec<Incident>,
}

struct MockBackend {
    state: Mutex<MockState>,
    complete_after: u64,
    fail_every: u64,
}

/// Outcome of one `/simulate` call
enum Step {
    Reply(SimulateResponse),
    Fail,
}

impl MockBackend {
    fn new(complete_after: u64, fail_every: u64) -> Self {
        Self { state: Mutex::new(MockState::default()), complete_after, fail_every }
    }

    fn status(&self) -> StatusResponse {
        let state = self.state.lock();
        StatusResponse {
            incidents_count: state.incidents.len(),
            status: Some("online".to_string()),
            processed_count: Some(state.processed),
        }
    }

    fn incidents(&self) -> Vec<Incident> {
        self.state.lock().incidents.clone()
    }

    fn reset(&self) {
        *self.state.lock() = MockState::default();
    }

    fn simulate(&self, mock_mode: bool) -> Step {
        let mut state = self.state.lock();
        state.calls += 1;

        if self.fail_every > 0 && state.calls % self.fail_every == 0 {
            return Step::Fail;
        }
        if !mock_mode {
            return Step::Reply(SimulateResponse {
                message: Some("No new incidents".to_string()),
                ..SimulateResponse::with_status(SimulationStatus::Other("waiting".to_string()))
            });
        }
        if self.complete_after > 0 && state.processed >= self.complete_after {
            return Step::Reply(SimulateResponse {
                message: Some("All reports processed".to_string()),
                ..SimulateResponse::with_status(SimulationStatus::Complete)
            });
        }

        let report = &REPORTS[(state.processed % REPORTS.len() as u64) as usize];
        state.processed += 1;

        let mut logs = vec![
            format!("Ingesting: {}...", report.text.chars().take(50).collect::<String>()),
            format!("Extract Agent: Identified {} at {}", report.kind, report.location),
            "Verify Agent: Cross-referencing 3 sources...".to_string(),
        ];

        let incident = match report.outcome {
            Outcome::Reject => {
                logs.push("Verify Agent: Rejected (Low Credibility)".to_string());
                None
            }
            Outcome::Create | Outcome::Merge => {
                logs.push(format!(
                    "Verify Agent: Credibility Score {}/100",
                    aura_watch::domain::confidence_percent(report.confidence)
                ));
                Some(consolidate(&mut state, report, &mut logs))
            }
        };

        Step::Reply(SimulateResponse {
            raw_data: Some(RawIntel {
                source: Some(report.source.to_string()),
                timestamp: Some(chrono::Local::now().format("%H:%M:%S").to_string()),
                text: Some(report.text.to_string()),
            }),
            logs: Some(logs),
            incident,
            ..SimulateResponse::with_status(SimulationStatus::Success)
        })
    }
}

/// Store the report's incident; a merge replaces the absorbed incident's id
fn consolidate(state: &mut MockState, report: &Report, logs: &mut Vec<String>) -> Incident {
    state.next_id += 1;
    let id = IncidentId::from(state.next_id);

    let absorbed = if report.outcome == Outcome::Merge {
        let pos = state.incidents.iter().rposition(|i| i.kind.as_deref() == Some(report.kind));
        pos.map(|pos| state.incidents.remove(pos).id)
    } else {
        None
    };

    match &absorbed {
        Some(old) => logs.push(format!("Memory Agent: Action: MERGED Incident #{} into #{}", old, id)),
        None => logs.push(format!("Memory Agent: Action: CREATED Incident #{}", id)),
    }

    let mut stored = Incident::new(id, report.kind, report.location)
        .with_coordinates(report.lat, report.lon)
        .with_severity(Severity::from(report.severity.to_string()))
        .with_confidence(report.confidence)
        .with_sources(vec![
            SourceCitation {
                title: Some(format!("{} report", report.kind)),
                source: Some(report.source.to_string()),
                url: None,
            },
            SourceCitation { title: Some("Regional news wire".to_string()), source: None, url: None },
        ]);

    // The store labels the type `type`, the step reply `incident_type`
    let reply = stored.clone();
    stored.kind = stored.incident_type.take();
    state.incidents.push(stored);
    reply
}

fn respond(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn json<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => respond(StatusCode::OK, "application/json", body),
        Err(e) => respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            e.to_string().into_bytes(),
        ),
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    backend: Arc<MockBackend>,
    latency: Duration,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(method = %method, path = %path, "mock_request");

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/status") => json(&backend.status()),
        (&Method::GET, "/incidents") => json(&backend.incidents()),
        (&Method::POST, "/simulate") => {
            // Missing or unreadable body means mock mode
            let mock_mode = match req.into_body().collect().await {
                Ok(body) => serde_json::from_slice::<SimulateRequest>(&body.to_bytes())
                    .map(|r| r.mock_mode)
                    .unwrap_or(true),
                Err(_) => true,
            };
            tokio::time::sleep(latency).await;

            match backend.simulate(mock_mode) {
                Step::Reply(reply) => {
                    info!(status = %String::from(reply.status.clone()), mock_mode = %mock_mode, "mock_simulate");
                    json(&reply)
                }
                Step::Fail => {
                    warn!("mock_simulate_injected_failure");
                    respond(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "application/json",
                        br#"{"detail":"injected failure"}"#.to_vec(),
                    )
                }
            }
        }
        (&Method::POST, "/reset") => {
            backend.reset();
            info!("mock_reset");
            json(&serde_json::json!({ "message": "System reset complete" }))
        }
        (&Method::OPTIONS, _) => {
            let mut response = respond(StatusCode::OK, "text/plain", Vec::new());
            let headers = response.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
            response
        }
        _ => respond(StatusCode::NOT_FOUND, "text/plain", b"Not Found".to_vec()),
    };

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    let backend = Arc::new(MockBackend::new(args.complete_after, args.fail_every));
    let latency = Duration::from_millis(args.latency_ms);

    info!(
        port = %args.port,
        complete_after = %args.complete_after,
        latency_ms = %args.latency_ms,
        fail_every = %args.fail_every,
        "mock_aura_started"
    );

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let backend = backend.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let backend = backend.clone();
                                async move { handle_request(req, backend, latency).await }
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                error!(error = %e, "mock_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_accept_error");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("mock_aura_shutdown");
                return Ok(());
            }
        }
    }
}
