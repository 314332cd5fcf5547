//! Integration tests for configuration loading

use aura_watch::infra::Config;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[backend]
api_url = "http://aura.test:9000/"
request_timeout_ms = 2500

[polling]
interval_ms = 1500
mock_mode = false

[dashboard]
intel_feed_cap = 5
map_center = [51.5, -0.12]
focus_zoom = 14

[logging]
level = "debug"
file = "/tmp/aura-test.log"
json = true

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.api_url(), "http://aura.test:9000/");
    assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.interval_ms(), 1500);
    assert!(!config.mock_mode());
    assert_eq!(config.intel_feed_cap(), 5);
    assert_eq!(config.map_center().lat, 51.5);
    assert_eq!(config.map_center().lon, -0.12);
    assert_eq!(config.focus_zoom(), 14);
    // Unset keys keep their defaults
    assert_eq!(config.marker_zoom(), 10);
    assert_eq!(config.min_interval_ms(), 500);
    assert_eq!(config.max_interval_ms(), 6000);
    assert_eq!(config.log_level(), "debug");
    assert!(config.log_json());
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.api_url(), "http://localhost:8000");
    assert_eq!(config.interval_ms(), 5000);
    assert!(config.mock_mode());
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[polling\ninterval_ms = ").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_shipped_dev_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml");
    let config = Config::from_file(path).unwrap();
    assert_eq!(config.api_url(), "http://localhost:8000");
    assert_eq!(config.interval_step_ms(), 500);
}
