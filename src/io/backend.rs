//! HTTP client for the incident simulation backend
//!
//! Endpoints (owned by the backend, consumed here):
//! - `GET /status` → `{ incidents_count }`
//! - `GET /incidents` → `[Incident]`
//! - `POST /simulate` `{ mock_mode }` → `SimulateResponse`
//! - `POST /reset` → status and body ignored
//!
//! All three failure kinds (network, HTTP status, undecodable body) surface
//! as [`BackendError`]; callers treat them identically.

use crate::domain::types::{
    Incident, SimulateRequest, SimulateResponse, StatusResponse,
};
use crate::infra::config::Config;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Operations the polling client needs from the backend
#[async_trait]
pub trait Backend: Send + Sync {
    async fn status(&self) -> Result<StatusResponse, BackendError>;

    async fn incidents(&self) -> Result<Vec<Incident>, BackendError>;

    async fn simulate(&self, mock_mode: bool) -> Result<SimulateResponse, BackendError>;

    async fn reset(&self) -> Result<(), BackendError>;
}

/// [`Backend`] over HTTP/JSON
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        // Create HTTP client once for reuse (connection pooling)
        let client = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { base_url: config.api_url().trim_end_matches('/').to_string(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn status(&self) -> Result<StatusResponse, BackendError> {
        let response = self.client.get(self.url("/status")).send().await?;
        Self::decode(response).await
    }

    async fn incidents(&self) -> Result<Vec<Incident>, BackendError> {
        let response = self.client.get(self.url("/incidents")).send().await?;
        Self::decode(response).await
    }

    async fn simulate(&self, mock_mode: bool) -> Result<SimulateResponse, BackendError> {
        let body = serde_json::to_vec(&SimulateRequest { mock_mode })?;
        debug!(mock_mode = %mock_mode, "simulate_request");
        let response = self
            .client
            .post(self.url("/simulate"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Any HTTP reply counts as done; only transport failures are errors
    async fn reset(&self) -> Result<(), BackendError> {
        let response = self.client.post(self.url("/reset")).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(status = %status.as_u16(), "reset_non_success_ignored");
        }
        Ok(())
    }
}
