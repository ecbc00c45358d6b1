/*!
 * Alarm Strategy Tests
 * Bounded calls running in the caller's thread under SIGALRM
 */

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::io::{self, Read};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};
use thiserror::Error;
use timebox::{checkpoint, timeout, ErrorKind, ExecutionFault, Interrupted, TimeoutError};

fn nap(seconds: f64) -> Result<f64, TimeoutError> {
    timebox::sleep(Duration::from_secs_f64(seconds))?;
    Ok(seconds)
}

#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
enum FetchError {
    #[error("fetch timed out: {0}")]
    TimedOut(String),
    #[error("fetch failed")]
    Failed,
}

impl ErrorKind for FetchError {
    fn timed_out(message: Option<&str>) -> Self {
        Self::TimedOut(message.unwrap_or_default().to_string())
    }

    fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    fn execution_fault(_fault: ExecutionFault) -> Self {
        Self::Failed
    }
}

impl From<Interrupted> for FetchError {
    fn from(_: Interrupted) -> Self {
        Self::TimedOut(String::new())
    }
}

#[test]
#[serial]
fn test_sleep_exceeding_bound_times_out() {
    let bounded = timeout().seconds(0.1).wrap(nap).unwrap();

    let start = Instant::now();
    let err = bounded.call(2.0).unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.message(), None);
    assert!(start.elapsed() < Duration::from_millis(500), "{:?}", start.elapsed());
}

#[test]
#[serial]
fn test_fast_call_returns_value() {
    let add = timeout()
        .seconds(0.1)
        .wrap(|(i, j): (i32, i32)| Ok::<_, TimeoutError>(i + j))
        .unwrap();

    assert_eq!(add.call((1, 2)), Ok(3));
}

#[test]
#[serial]
fn test_no_limit_runs_to_completion() {
    let bounded = timeout().wrap(nap).unwrap();
    assert!(!bounded.config().is_bounded());
    assert_eq!(bounded.call(0.3), Ok(0.3));
}

#[test]
#[serial]
fn test_override_takes_precedence() {
    let bounded = timeout().seconds(0.05).wrap(nap).unwrap();
    assert_eq!(bounded.call_with_timeout(0.2, 1.0), Ok(0.2));

    let bounded = timeout().seconds(5.0).wrap(nap).unwrap();
    assert!(bounded.call_with_timeout(1.0, 0.05).unwrap_err().is_timeout());
}

#[test]
#[serial]
fn test_zero_override_disables_enforcement() {
    let bounded = timeout().seconds(0.05).wrap(nap).unwrap();
    assert_eq!(bounded.call_with_timeout(0.2, 0.0), Ok(0.2));

    // The override applies to one call only.
    assert!(bounded.call(0.2).unwrap_err().is_timeout());
}

#[test]
#[serial]
fn test_huge_override_is_clamped() {
    let bounded = timeout().seconds(1.0).wrap(nap).unwrap();
    assert_eq!(bounded.call_with_timeout(0.01, 1e20), Ok(0.01));
    assert_eq!(bounded.call_with_timeout(0.01, f64::INFINITY), Ok(0.01));
}

#[test]
#[serial]
fn test_custom_error_kind_and_message() {
    let fetch = timeout()
        .seconds(0.05)
        .error_message("Timeout exceeded.")
        .wrap(|url: String| {
            timebox::sleep(Duration::from_secs(1))?;
            Ok::<_, FetchError>(url.len())
        })
        .unwrap();

    assert_eq!(
        fetch.call("https://example.com".into()),
        Err(FetchError::TimedOut("Timeout exceeded.".into()))
    );
}

#[test]
#[serial]
fn test_function_errors_propagate_unchanged() {
    let bounded = timeout()
        .seconds(1.0)
        .wrap(|_: ()| Err::<(), _>(FetchError::Failed))
        .unwrap();
    assert_eq!(bounded.call(()), Err(FetchError::Failed));
}

#[test]
#[serial]
fn test_checkpoint_loop_is_interrupted() {
    let spin = timeout()
        .seconds(0.05)
        .wrap(|limit: u64| {
            let mut n = 0u64;
            while n < limit {
                checkpoint()?;
                n = n.wrapping_add(1);
            }
            Ok::<_, TimeoutError>(n)
        })
        .unwrap();

    assert!(spin.call(u64::MAX).unwrap_err().is_timeout());
}

#[test]
#[serial]
fn test_nested_call_cannot_outlive_outer_bound() {
    let inner = timeout()
        .seconds(5.0)
        .wrap(|x: u32| {
            timebox::sleep(Duration::from_millis(800))?;
            Ok::<_, TimeoutError>(x)
        })
        .unwrap();
    let inner_stats = std::sync::Arc::clone(inner.stats());
    let outer = timeout().seconds(0.06).wrap(move |x: u32| inner.call(x)).unwrap();

    let start = Instant::now();
    let err = outer.call(7).unwrap_err();

    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_millis(400), "{:?}", start.elapsed());
    assert_eq!(outer.stats().snapshot().alarms_fired, 1);
    assert_eq!(inner_stats.snapshot().alarms_fired, 0);
}

#[test]
#[serial]
fn test_blocking_read_is_interrupted() {
    let read = timeout()
        .seconds(0.1)
        .error_message("read timed out")
        .wrap_in_process(|_: ()| {
            let (mut reader, _writer) = UnixStream::pair()?;
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        })
        .unwrap();

    let start = Instant::now();
    let err = read.call(()).unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    assert_eq!(err.to_string(), "read timed out");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
#[serial]
fn test_stats_track_alarms() {
    let bounded = timeout().seconds(0.05).wrap(nap).unwrap();

    let _ = bounded.call(1.0);
    let _ = bounded.call(0.0);

    let snap = bounded.stats().snapshot();
    assert_eq!(snap.calls, 2);
    assert_eq!(snap.attempts, 2);
    assert_eq!(snap.timeouts, 1);
    assert_eq!(snap.alarms_fired, 1);
    assert_eq!(snap.workers_spawned, 0);
}
