//! Configuration files, rules files and flag overrides.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use controller_app::authorization::permissions;
use controller_app::session::{SESSION_COOKIE, USER_COOKIE};
use controller_app::{BarrierPolicy, CookieStore};
use controller_client::config::{Cli, ClientConfig, ConfigError};
use tempfile::{tempdir, NamedTempFile};

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = ClientConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ClientConfig::default());
}

#[test]
fn test_file_values_and_cookies() {
    let file = write_file(
        r#"
        origin = "https://controller.example"
        reconnect_delay_ms = 500

        [cookies]
        session_id = "s3cr3t"
        user = '{"id":4,"username":"ada","roles":["admin"]}'

        [engine]
        barrier_policy = "errors_complete"
        session_minutes = 15
        "#,
    );
    let config = ClientConfig::load(file.path()).unwrap();

    assert_eq!(config.origin, "https://controller.example");
    assert_eq!(config.reconnect_delay().as_millis(), 500);
    assert_eq!(config.engine.barrier_policy, BarrierPolicy::ErrorsComplete);
    assert_eq!(config.engine.session_minutes, 15);

    let cookies = config.cookie_store();
    assert_eq!(cookies.get(SESSION_COOKIE).as_deref(), Some("s3cr3t"));
    assert!(cookies.get(USER_COOKIE).unwrap().contains("\"ada\""));
}

#[test]
fn test_malformed_file_reports_path() {
    let file = write_file("origin = [");
    let err = ClientConfig::load(file.path()).unwrap_err();
    match err {
        ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_rules_file_replaces_engine_rules() {
    let rules = write_file(
        r#"
        [auditor]
        static = ["contacts:read", "demographics:read"]
        "#,
    );
    let mut config = ClientConfig {
        rules_file: Some(rules.path().to_path_buf()),
        ..ClientConfig::default()
    };
    config.resolve_rules().unwrap();

    assert!(config.engine.rules.role_grants("auditor", permissions::CONTACTS_READ));
    assert!(!config.engine.rules.role_grants("admin", permissions::CONTACTS_READ));
}

#[test]
fn test_flags_override_file() {
    let file = write_file(
        r#"
        origin = "http://from-file:3100"
        log_level = "warn"
        "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        origin: Some("http://from-flag:3100".to_string()),
        session_cookie: Some("flag-session".to_string()),
        verbose: true,
        exit_when_ready: true,
        ..Cli::default()
    };
    let config = ClientConfig::from_cli(&cli).unwrap();

    assert_eq!(config.origin, "http://from-flag:3100");
    assert_eq!(config.log_level, "debug");
    assert!(config.exit_when_ready);
    assert_eq!(config.cookie_store().get(SESSION_COOKIE).as_deref(), Some("flag-session"));
}

#[test]
fn test_invalid_origin_rejected() {
    let cli = Cli {
        config: Some(tempdir().unwrap().path().join("none.toml")),
        origin: Some("not a url".to_string()),
        ..Cli::default()
    };
    assert!(matches!(
        ClientConfig::from_cli(&cli),
        Err(ConfigError::InvalidOrigin { .. })
    ));
}
