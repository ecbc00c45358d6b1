/*!
 * Recovery Tests
 * Fallbacks substituted for timeouts under both strategies
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use timebox::{timeout, ErrorKind, PipelineShape, TimeoutError};

fn slow_greeting(name: String) -> Result<String, TimeoutError> {
    timebox::sleep(Duration::from_secs(2))?;
    Ok(format!("hello {name}"))
}

#[test]
#[serial]
fn test_fallback_value_replaces_timeout() {
    let greet = timeout()
        .seconds(0.05)
        .on_timeout(|| Ok("fallback".to_string()))
        .wrap(slow_greeting)
        .unwrap();
    assert_eq!(greet.config().shape, PipelineShape::Recover);

    assert_eq!(greet.call("ada".into()), Ok("fallback".to_string()));
    assert_eq!(greet.stats().snapshot().fallbacks, 1);
}

#[test]
#[serial]
fn test_fallback_receives_configured_arguments() {
    let greet = timeout()
        .seconds(0.05)
        .on_timeout_with(
            |(code, reason): (u16, String)| Ok(format!("{code} {reason}")),
            (504, "Gateway Timeout".to_string()),
        )
        .wrap(slow_greeting)
        .unwrap();

    assert_eq!(greet.call("ada".into()), Ok("504 Gateway Timeout".to_string()));
    assert_eq!(greet.call("bob".into()), Ok("504 Gateway Timeout".to_string()));
}

#[test]
#[serial]
fn test_fallback_not_used_on_success() {
    let used = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&used);
    let bounded = timeout()
        .seconds(1.0)
        .on_timeout(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        })
        .wrap(|x: i32| Ok::<_, TimeoutError>(x * 10))
        .unwrap();

    assert_eq!(bounded.call(4), Ok(40));
    assert_eq!(used.load(Ordering::SeqCst), 0);
}

#[test]
#[serial]
fn test_other_errors_bypass_fallback() {
    let bounded = timeout()
        .seconds(1.0)
        .on_timeout(|| Ok(0))
        .wrap(|x: i32| Err::<i32, _>(TimeoutError::failed(format!("bad {x}"))))
        .unwrap();

    assert_eq!(bounded.call(3), Err(TimeoutError::failed("bad 3")));
}

#[test]
#[serial]
fn test_self_reported_timeout_is_recovered() {
    // An error that reports itself as a timeout is indistinguishable from one.
    let bounded = timeout()
        .seconds(1.0)
        .on_timeout(|| Ok(-1))
        .wrap(|_: ()| Err::<i32, _>(TimeoutError::timed_out(Some("upstream"))))
        .unwrap();

    assert_eq!(bounded.call(()), Ok(-1));
}

#[test]
#[serial]
fn test_fallback_under_worker_strategy() {
    let bounded = timeout()
        .seconds(0.1)
        .use_worker_strategy()
        .on_timeout_with(|n: u32| Ok(n), 42)
        .wrap(|n: u32| {
            std::thread::sleep(Duration::from_secs(2));
            Ok::<_, TimeoutError>(n)
        })
        .unwrap();

    assert_eq!(bounded.call(1), Ok(42));
    let snap = bounded.stats().snapshot();
    assert_eq!(snap.fallbacks, 1);
    assert_eq!(snap.workers_killed, 1);
}
