//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::Coordinates;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { api_url: default_api_url(), request_timeout_ms: default_request_timeout_ms() }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Delay between the end of one poll cycle and the start of the next
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Interval change per speed keypress
    #[serde(default = "default_interval_step_ms")]
    pub interval_step_ms: u64,
    /// Ask the backend to replay its canned dataset instead of live feeds
    #[serde(default = "default_mock_mode")]
    pub mock_mode: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            interval_step_ms: default_interval_step_ms(),
            mock_mode: default_mock_mode(),
        }
    }
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_min_interval_ms() -> u64 {
    500
}

fn default_max_interval_ms() -> u64 {
    6000
}

fn default_interval_step_ms() -> u64 {
    500
}

fn default_mock_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Maximum intel cards kept on screen
    #[serde(default = "default_intel_feed_cap")]
    pub intel_feed_cap: usize,
    /// Initial map center as [lat, lon]
    #[serde(default = "default_map_center")]
    pub map_center: [f64; 2],
    #[serde(default = "default_map_zoom")]
    pub map_zoom: u8,
    /// Zoom used when a new incident pans the map
    #[serde(default = "default_marker_zoom")]
    pub marker_zoom: u8,
    /// Zoom used when the operator focuses a verified incident
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            intel_feed_cap: default_intel_feed_cap(),
            map_center: default_map_center(),
            map_zoom: default_map_zoom(),
            marker_zoom: default_marker_zoom(),
            focus_zoom: default_focus_zoom(),
        }
    }
}

fn default_intel_feed_cap() -> usize {
    20
}

fn default_map_center() -> [f64; 2] {
    [20.0, 0.0]
}

fn default_map_zoom() -> u8 {
    2
}

fn default_marker_zoom() -> u8 {
    10
}

fn default_focus_zoom() -> u8 {
    12
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file used while the TUI owns the terminal
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: default_log_file(), json: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "aura-watch.log".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval between metrics summary log lines (0 to disable)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    api_url: String,
    request_timeout_ms: u64,
    interval_ms: u64,
    min_interval_ms: u64,
    max_interval_ms: u64,
    interval_step_ms: u64,
    mock_mode: bool,
    intel_feed_cap: usize,
    map_center: Coordinates,
    map_zoom: u8,
    marker_zoom: u8,
    focus_zoom: u8,
    log_level: String,
    log_file: String,
    log_json: bool,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let polling = toml_config.polling;
        // Swapped bounds would make every clamp panic
        let min_interval_ms = polling.min_interval_ms.min(polling.max_interval_ms);
        let max_interval_ms = polling.max_interval_ms.max(polling.min_interval_ms);

        Self {
            api_url: toml_config.backend.api_url,
            request_timeout_ms: toml_config.backend.request_timeout_ms,
            interval_ms: polling.interval_ms,
            min_interval_ms,
            max_interval_ms,
            interval_step_ms: polling.interval_step_ms,
            mock_mode: polling.mock_mode,
            intel_feed_cap: toml_config.dashboard.intel_feed_cap,
            map_center: Coordinates::from(toml_config.dashboard.map_center),
            map_zoom: toml_config.dashboard.map_zoom,
            marker_zoom: toml_config.dashboard.marker_zoom,
            focus_zoom: toml_config.dashboard.focus_zoom,
            log_level: toml_config.logging.level,
            log_file: toml_config.logging.file,
            log_json: toml_config.logging.json,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path from the CLI value or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Clamp an interval into the configured speed range
    pub fn clamp_interval_ms(&self, ms: u64) -> u64 {
        ms.clamp(self.min_interval_ms, self.max_interval_ms)
    }

    // Getters for all config fields
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }

    pub fn max_interval_ms(&self) -> u64 {
        self.max_interval_ms
    }

    pub fn interval_step_ms(&self) -> u64 {
        self.interval_step_ms
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    pub fn intel_feed_cap(&self) -> usize {
        self.intel_feed_cap
    }

    pub fn map_center(&self) -> Coordinates {
        self.map_center
    }

    pub fn map_zoom(&self) -> u8 {
        self.map_zoom
    }

    pub fn marker_zoom(&self) -> u8 {
        self.marker_zoom
    }

    pub fn focus_zoom(&self) -> u8 {
        self.focus_zoom
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Override the backend base URL (CLI flag)
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the poll interval (CLI flag)
    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    /// Override the simulation mode flag (CLI flag)
    pub fn with_mock_mode(mut self, mock_mode: bool) -> Self {
        self.mock_mode = mock_mode;
        self
    }

    /// Builder method for tests to shrink the intel feed
    #[cfg(test)]
    pub fn with_intel_feed_cap(mut self, cap: usize) -> Self {
        self.intel_feed_cap = cap;
        self
    }
}
