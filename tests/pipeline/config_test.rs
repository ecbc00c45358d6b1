/*!
 * Configuration Tests
 * Everything rejected before the wrapped function runs
 */

use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use time::OffsetDateTime;
use timebox::{timeout, ConfigError, TimeoutError};

#[test]
fn test_negative_retries_rejected_at_wrap_time() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    let err = timeout::<(), TimeoutError>()
        .seconds(1.0)
        .retries(-3)
        .wrap(move |_: ()| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err, ConfigError::NegativeRetries(-3));
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_past_deadline_rejected() {
    let err = timeout::<(), TimeoutError>()
        .limit(SystemTime::now() - Duration::from_secs(60))
        .wrap(|_: ()| Ok(()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLimit(s) if s < 0.0));
}

#[test]
fn test_negative_component_rejected() {
    let err = timeout::<(), TimeoutError>()
        .seconds(-1.0)
        .config()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLimit(_)));
}

#[test]
fn test_limit_forms_combine() {
    let config = timeout::<(), TimeoutError>()
        .limit(Duration::from_millis(1500))
        .seconds(0.5)
        .minutes(1.0)
        .hours(1.0)
        .config()
        .unwrap();
    assert_eq!(config.total_seconds, 3662.0);
}

#[test]
#[serial]
fn test_deadline_resolved_once_at_wrap_time() {
    // The window is fixed when wrapping; later calls still get the full window
    // even once the absolute deadline has passed.
    let bounded = timeout()
        .limit(OffsetDateTime::now_utc() + time::Duration::milliseconds(300))
        .wrap(|ms: u64| {
            timebox::sleep(Duration::from_millis(ms))?;
            Ok::<_, TimeoutError>(ms)
        })
        .unwrap();

    let window = bounded.config().total_seconds;
    assert!(window > 0.2 && window <= 0.3, "{window}");

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(bounded.call(100), Ok(100));
}

#[test]
fn test_config_error_diagnostics() {
    use miette::Diagnostic;

    let err = ConfigError::NegativeRetries(-1);
    let code = err.code().map(|c| c.to_string());
    assert_eq!(code.as_deref(), Some("config::negative_retries"));
    assert!(err.help().is_some());
}
