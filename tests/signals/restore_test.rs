/*!
 * SIGALRM Restoration Tests
 * The caller's disposition and an idle timer survive every way a call ends
 */

use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use serial_test::serial;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use timebox::{timeout, ErrorKind, TimeoutError};

static SENTINEL_HITS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn sentinel(_signal: libc::c_int) {
    SENTINEL_HITS.fetch_add(1, Ordering::SeqCst);
}

/// Sentinel SIGALRM disposition installed for the length of one test
struct Sentinel {
    previous: SigAction,
}

impl Sentinel {
    fn install() -> Self {
        SENTINEL_HITS.store(0, Ordering::SeqCst);
        let action = SigAction::new(
            SigHandler::Handler(sentinel),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let previous = unsafe { sigaction(Signal::SIGALRM, &action) }.unwrap();
        Self { previous }
    }

    fn assert_restored(&self) {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let current = unsafe { sigaction(Signal::SIGALRM, &ignore) }.unwrap();
        unsafe { sigaction(Signal::SIGALRM, &current) }.unwrap();

        assert!(
            matches!(current.handler(), SigHandler::Handler(f) if f as usize == sentinel as usize),
            "SIGALRM disposition not restored: {:?}",
            current.handler()
        );
        assert_eq!(timer_value(), Duration::ZERO);
        assert_eq!(SENTINEL_HITS.load(Ordering::SeqCst), 0);
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        unsafe {
            let _ = sigaction(Signal::SIGALRM, &self.previous);
        }
    }
}

fn timer_value() -> Duration {
    let mut current: libc::itimerval = unsafe { std::mem::zeroed() };
    assert_eq!(unsafe { libc::getitimer(libc::ITIMER_REAL, &mut current) }, 0);
    Duration::from_secs(current.it_value.tv_sec as u64)
        + Duration::from_micros(current.it_value.tv_usec as u64)
}

#[test]
#[serial]
fn test_restored_after_timeout() {
    let sentinel = Sentinel::install();
    let bounded = timeout()
        .seconds(0.05)
        .wrap(|_: ()| {
            timebox::sleep(Duration::from_secs(1))?;
            Ok::<_, TimeoutError>(())
        })
        .unwrap();

    assert!(bounded.call(()).unwrap_err().is_timeout());
    sentinel.assert_restored();
}

#[test]
#[serial]
fn test_restored_after_function_error() {
    let sentinel = Sentinel::install();
    let bounded = timeout()
        .seconds(5.0)
        .wrap(|_: ()| Err::<(), _>(TimeoutError::failed("rejected")))
        .unwrap();

    assert_eq!(bounded.call(()), Err(TimeoutError::failed("rejected")));
    sentinel.assert_restored();
}

#[test]
#[serial]
fn test_restored_after_panic() {
    let sentinel = Sentinel::install();
    let bounded = timeout()
        .seconds(5.0)
        .wrap(|_: ()| -> Result<(), TimeoutError> { panic!("job blew up") })
        .unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| bounded.call(())));
    assert!(outcome.is_err());
    sentinel.assert_restored();
}

#[test]
#[serial]
fn test_restored_after_success() {
    let sentinel = Sentinel::install();
    let bounded = timeout()
        .seconds(5.0)
        .wrap(|x: u8| Ok::<_, TimeoutError>(x + 1))
        .unwrap();

    assert_eq!(bounded.call(1), Ok(2));
    sentinel.assert_restored();
}

#[test]
#[serial]
fn test_restored_after_exhausted_retries() {
    let sentinel = Sentinel::install();
    let bounded = timeout()
        .seconds(0.02)
        .retries(2)
        .wrap(|_: ()| {
            timebox::sleep(Duration::from_secs(1))?;
            Ok::<_, TimeoutError>(())
        })
        .unwrap();

    assert!(bounded.call(()).unwrap_err().is_timeout());
    sentinel.assert_restored();
}
