/*!
 * Settings Tests
 * Bounded calls built from JSON documents and the environment
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use timebox::pipeline::{ENV_RETRIES, ENV_SECONDS, ENV_USE_SIGNALS};
use timebox::{ConfigError, ErrorKind, TimeoutError, TimeoutSettings};

fn settings_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn test_bounded_call_from_file() {
    let file = settings_file(r#"{"seconds": 0.05, "error_message": "too slow", "retries": 1}"#);

    let bounded = TimeoutSettings::from_path(file.path())
        .unwrap()
        .into_builder()
        .unwrap()
        .wrap(|ms: u64| {
            timebox::sleep(Duration::from_millis(ms))?;
            Ok::<_, TimeoutError>(ms)
        })
        .unwrap();

    assert_eq!(bounded.call(1), Ok(1));
    let err = bounded.call(1_000).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "too slow");
    assert_eq!(bounded.stats().snapshot().retries, 1);
}

#[test]
fn test_missing_file_reports_path() {
    let err = TimeoutSettings::from_path("/nonexistent/timebox.json").unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert_eq!(path, "/nonexistent/timebox.json"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_non_integer_retries_rejected() {
    let file = settings_file(r#"{"seconds": 1, "retries": 1.1}"#);
    let err = TimeoutSettings::from_path(file.path())
        .unwrap()
        .into_builder::<(), TimeoutError>()
        .err()
        .unwrap();

    assert_eq!(err, ConfigError::NonIntegerRetries("1.1".into()));
    assert_eq!(err.to_string(), "retries must be an integer");
}

#[test]
fn test_malformed_json_rejected() {
    let file = settings_file("{ seconds: 1 ");
    let err = TimeoutSettings::from_path(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSettings(_)));
}

#[test]
#[serial]
fn test_environment_overrides() {
    std::env::set_var(ENV_SECONDS, "2.5");
    std::env::set_var(ENV_RETRIES, "3");
    std::env::set_var(ENV_USE_SIGNALS, "0");

    let settings = TimeoutSettings::disabled().apply_env();

    std::env::remove_var(ENV_SECONDS);
    std::env::remove_var(ENV_RETRIES);
    std::env::remove_var(ENV_USE_SIGNALS);

    let config = settings
        .unwrap()
        .into_builder::<(), TimeoutError>()
        .unwrap()
        .config()
        .unwrap();
    assert_eq!(config.total_seconds, 2.5);
    assert_eq!(config.retries, 3);
    assert!(config.use_worker_strategy);
}

#[test]
#[serial]
fn test_environment_non_integer_retries() {
    std::env::set_var(ENV_RETRIES, "2.0");
    let settings = TimeoutSettings::new().apply_env();
    std::env::remove_var(ENV_RETRIES);

    let err = settings
        .unwrap()
        .into_builder::<(), TimeoutError>()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::NonIntegerRetries(_)));
}
