//! Integration tests for the HTTP backend client against a local server

use aura_watch::domain::types::{IncidentId, SimulationStatus};
use aura_watch::infra::Config;
use aura_watch::io::{Backend, BackendError, HttpBackend};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Request seen by the test server
#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    body: String,
}

/// Serve one fixed (status, body) reply for every request and record requests
async fn serve(status: StatusCode, body: &'static str) -> (SocketAddr, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let log = log.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let log = log.clone();
                    async move {
                        let method = req.method().to_string();
                        let path = req.uri().path().to_string();
                        let bytes = req.into_body().collect().await.unwrap().to_bytes();
                        log.lock().push(Seen {
                            method,
                            path,
                            body: String::from_utf8_lossy(&bytes).to_string(),
                        });
                        let mut response = Response::new(Full::new(Bytes::from(body)));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
            });
        }
    });

    (addr, seen)
}

fn client(addr: SocketAddr) -> HttpBackend {
    let config = Config::default().with_api_url(format!("http://{}/", addr));
    HttpBackend::new(&config).unwrap()
}

#[tokio::test]
async fn test_simulate_posts_mock_mode_and_decodes() {
    let body = r#"{
        "status": "success",
        "logs": ["Action: CREATED Incident #7"],
        "raw_data": {"text": "Flooding", "source": "twitter", "timestamp": "10:00:00"},
        "incident": {"id": 7, "incident_type": "Flood", "location_text": "Chennai",
                     "coordinates": [13.08, 80.27], "confidence": 0.9, "severity": "Critical"}
    }"#;
    let (addr, seen) = serve(StatusCode::OK, body).await;
    let backend = client(addr);

    let response = backend.simulate(false).await.unwrap();
    assert_eq!(response.status, SimulationStatus::Success);
    let incident = response.incident.unwrap();
    assert_eq!(incident.id, IncidentId::from(7));
    assert!(incident.is_critical());

    let requests = seen.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/simulate");
    assert_eq!(requests[0].body, r#"{"mock_mode":false}"#);
}

#[tokio::test]
async fn test_incidents_accept_type_field_and_string_ids() {
    let body = r#"[
        {"id": "a1", "type": "Wildfire", "location_text": "Santa Rosa", "coordinates": [38.4, -122.7]},
        {"id": 2, "type": "Flood", "location_text": "Chennai"}
    ]"#;
    let (addr, seen) = serve(StatusCode::OK, body).await;

    let incidents = client(addr).incidents().await.unwrap();
    assert_eq!(incidents.len(), 2);
    assert_eq!(incidents[0].type_label(), "Wildfire");
    assert_eq!(incidents[1].id, IncidentId::from("2"));
    assert!(incidents[1].coordinates.is_none());
    assert_eq!(seen.lock()[0].path, "/incidents");
}

#[tokio::test]
async fn test_status_decodes_count() {
    let (addr, _) =
        serve(StatusCode::OK, r#"{"status":"online","incidents_count":3,"processed_count":9}"#)
            .await;
    let status = client(addr).status().await.unwrap();
    assert_eq!(status.incidents_count, 3);
}

#[tokio::test]
async fn test_server_error_is_status_error() {
    let (addr, _) = serve(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"boom"}"#).await;
    let err = client(addr).simulate(true).await.unwrap_err();
    assert!(matches!(err, BackendError::Status(500)));
}

#[tokio::test]
async fn test_garbage_body_is_decode_error() {
    let (addr, _) = serve(StatusCode::OK, "<html>not json</html>").await;
    let err = client(addr).status().await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)));
}

#[tokio::test]
async fn test_reset_accepts_any_http_reply() {
    let (addr, seen) = serve(StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>").await;
    client(addr).reset().await.unwrap();
    let requests = seen.lock().clone();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/reset");
}

#[tokio::test]
async fn test_reset_without_server_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).reset().await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).incidents().await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
}
