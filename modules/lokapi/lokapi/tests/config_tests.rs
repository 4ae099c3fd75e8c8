#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use lokapi::{LokApi, LokApiConfig};
use lokapi_sdk::{FanOutMode, LokapiError};
use tempfile::NamedTempFile;

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn defaults_without_file() {
    temp_env::with_vars_unset(
        [
            "LOKAPI__HOST",
            "LOKAPI__DB_NAME",
            "LOKAPI__FAN_OUT",
            "LOKAPI__API_VERSION",
            "LOKAPI__TRANSPORT__TIMEOUT_MS",
        ],
        || {
            let config = LokApiConfig::load(None).unwrap();
            assert_eq!(config, LokApiConfig::default());
            assert_eq!(config.api_version, 12);
            assert_eq!(config.fan_out, FanOutMode::Parallel);
            assert_eq!(config.transport.timeout_ms, 30_000);
            assert!(!config.transport.allow_insecure_http);
        },
    );
}

#[test]
fn yaml_file_is_loaded() {
    let file = yaml_file(
        "host: odoo.example.org\n\
         db_name: lokavaluto\n\
         fan_out: sequential\n\
         transport:\n  timeout_ms: 5000\n",
    );

    temp_env::with_vars_unset(["LOKAPI__HOST", "LOKAPI__FAN_OUT"], || {
        let config = LokApiConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "odoo.example.org");
        assert_eq!(config.db_name, "lokavaluto");
        assert_eq!(config.fan_out, FanOutMode::Sequential);
        assert_eq!(config.transport.timeout_ms, 5000);
        assert_eq!(config.transport.max_body_size, 10 * 1024 * 1024);
    });
}

#[test]
fn environment_overrides_file() {
    let file = yaml_file("host: odoo.example.org\ndb_name: lokavaluto\n");

    temp_env::with_vars(
        [
            ("LOKAPI__HOST", Some("odoo.test.org")),
            ("LOKAPI__TRANSPORT__TIMEOUT_MS", Some("1500")),
            ("LOKAPI__FAN_OUT", Some("sequential")),
        ],
        || {
            let config = LokApiConfig::load(Some(file.path())).unwrap();
            assert_eq!(config.host, "odoo.test.org");
            assert_eq!(config.db_name, "lokavaluto");
            assert_eq!(config.transport.timeout_ms, 1500);
            assert_eq!(config.fan_out, FanOutMode::Sequential);
        },
    );
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LokApiConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(matches!(err, LokapiError::Config(ref m) if m.contains("does not exist")));
}

#[test]
fn unknown_field_is_rejected() {
    let file = yaml_file("host: odoo.example.org\nretries: 3\n");
    let err = LokApiConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, LokapiError::Config(_)));
}

#[test]
fn invalid_fan_out_is_rejected() {
    let file = yaml_file("fan_out: sometimes\n");
    let err = LokApiConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, LokapiError::Config(_)));
}

#[tokio::test]
async fn client_from_config_starts_logged_out() {
    let api = LokApi::from_config(&LokApiConfig::new("odoo.example.org", "lokavaluto")).unwrap();

    assert!(!api.is_logged_in());
    assert_eq!(api.capabilities().fan_out, FanOutMode::Parallel);
    assert!(api.capabilities().store.is_some());
    assert!(matches!(api.get_accounts().await, Err(LokapiError::NotLoggedIn)));
}
