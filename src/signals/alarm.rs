/*!
 * SIGALRM Interval Timer
 *
 * Scoped acquisition of the process-wide SIGALRM disposition and the
 * `ITIMER_REAL` interval timer.
 *
 * ## Delivery
 *
 * The handler performs async-signal-safe atomic stores only. When the kernel
 * delivers SIGALRM to a thread other than the one that armed the timer, the
 * handler forwards it with `pthread_kill`, so blocking syscalls on the armed
 * thread observe `EINTR` (the handler is installed without `SA_RESTART`).
 *
 * ## Interruptible Points
 *
 * Rust code cannot be unwound from a signal handler. Instead the handler
 * raises an "interrupt pending" flag that [`checkpoint`] and [`sleep`]
 * observe; the executor discards the call's own outcome once the flag is set.
 *
 * ## Nesting
 *
 * [`AlarmGuard::arm`] captures the previous handler, the previous timer's
 * remaining time and the previous pending state. Dropping the guard restores
 * all of them, re-arming an outer timer with whatever time it had left.
 *
 * An inner window never outlives the enclosing one: when the outer timer has
 * less time left than requested, the inner guard arms only that remainder. If
 * it fires, the expiry belongs to the outer bound. The inner guard does not
 * report it as its own and hands the pending state back on drop.
 */

use crate::core::errors::Interrupted;
use crate::core::limits::{MIN_TIMER_INTERVAL, SLEEP_SLICE};
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static ARMED: AtomicBool = AtomicBool::new(false);
static ARMED_THREAD: AtomicUsize = AtomicUsize::new(0);
static PENDING: AtomicBool = AtomicBool::new(false);
/// Handler invocations in progress on any thread
static IN_HANDLER: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_alarm(_signal: libc::c_int) {
    IN_HANDLER.fetch_add(1, Ordering::SeqCst);

    if ARMED.load(Ordering::SeqCst) {
        let target = ARMED_THREAD.load(Ordering::SeqCst);
        if current_thread() != target {
            unsafe {
                libc::pthread_kill(target as libc::pthread_t, libc::SIGALRM);
            }
        } else {
            PENDING.store(true, Ordering::SeqCst);
        }
    }

    IN_HANDLER.fetch_sub(1, Ordering::SeqCst);
}

#[inline]
fn current_thread() -> usize {
    unsafe { libc::pthread_self() as usize }
}

/// Swallow SIGALRMs that are still in flight after the timer was disarmed
///
/// Runs before the previous disposition comes back, which may be `SIG_DFL`
/// (terminate the process).
fn drain_in_flight() {
    while IN_HANDLER.load(Ordering::SeqCst) != 0 {
        std::hint::spin_loop();
    }

    let mut alarm = SigSet::empty();
    alarm.add(Signal::SIGALRM);
    let previous_mask = match alarm.thread_swap_mask(SigmaskHow::SIG_BLOCK) {
        Ok(mask) => mask,
        Err(errno) => {
            warn!(error = %errno, "failed to block SIGALRM while draining");
            return;
        }
    };

    let poll = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    while unsafe { libc::sigtimedwait(alarm.as_ref(), std::ptr::null_mut(), &poll) } > 0 {
        debug!("drained stray SIGALRM");
    }

    if let Err(errno) = previous_mask.thread_set_mask() {
        warn!(error = %errno, "failed to restore signal mask");
    }
}

fn to_timeval(duration: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_usec: duration.subsec_micros() as libc::suseconds_t,
    }
}

fn from_timeval(value: &libc::timeval) -> Duration {
    Duration::from_secs(value.tv_sec.max(0) as u64)
        + Duration::from_micros(value.tv_usec.max(0) as u64)
}

/// Time left on `ITIMER_REAL`, zero when disarmed
fn timer_remaining() -> nix::Result<Duration> {
    let mut current: libc::itimerval = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getitimer(libc::ITIMER_REAL, &mut current) };
    Errno::result(rc)?;
    Ok(from_timeval(&current.it_value))
}

/// Arm (or with `Duration::ZERO`, disarm) `ITIMER_REAL` as a one-shot timer.
///
/// Returns the time the previously armed timer had left.
fn set_timer(value: Duration) -> nix::Result<Duration> {
    let value = if value.is_zero() {
        value
    } else {
        value.max(MIN_TIMER_INTERVAL)
    };

    let new = libc::itimerval {
        it_interval: to_timeval(Duration::ZERO),
        it_value: to_timeval(value),
    };
    let mut old: libc::itimerval = unsafe { std::mem::zeroed() };

    let rc = unsafe { libc::setitimer(libc::ITIMER_REAL, &new, &mut old) };
    Errno::result(rc)?;
    Ok(from_timeval(&old.it_value))
}

/// Whether the alarm armed by the current thread has fired
#[inline]
pub fn interrupt_pending() -> bool {
    ARMED.load(Ordering::SeqCst)
        && PENDING.load(Ordering::SeqCst)
        && ARMED_THREAD.load(Ordering::SeqCst) == current_thread()
}

/// Interruptible point: fails once the current thread's alarm has fired
#[inline]
pub fn checkpoint() -> Result<(), Interrupted> {
    if interrupt_pending() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Sleep that returns early with [`Interrupted`] when the alarm fires
///
/// Outside a bounded call this is an ordinary sleep.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    let deadline = Instant::now() + duration;

    loop {
        checkpoint()?;

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }

        let slice = (deadline - now).min(SLEEP_SLICE);
        let request = libc::timespec {
            tv_sec: slice.as_secs() as libc::time_t,
            tv_nsec: slice.subsec_nanos() as libc::c_long,
        };
        // EINTR is the wakeup we want; the loop re-checks the flag.
        unsafe {
            libc::nanosleep(&request, std::ptr::null_mut());
        }
    }
}

/// Armed SIGALRM timer; disarms and restores prior state on drop
#[must_use = "the timer is disarmed as soon as the guard is dropped"]
pub struct AlarmGuard {
    previous_action: SigAction,
    previous_remaining: Duration,
    previous_armed: bool,
    previous_thread: usize,
    previous_pending: bool,
    /// The window is the enclosing timer's remainder, so a fire is the outer's
    outer_bound: bool,
    armed_at: Instant,
}

impl AlarmGuard {
    /// Install the alarm handler and arm a one-shot timer for `duration`
    pub fn arm(duration: Duration) -> nix::Result<Self> {
        let outer_left = timer_remaining()?;

        let action = SigAction::new(
            SigHandler::Handler(on_alarm),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let previous_action = unsafe { sigaction(Signal::SIGALRM, &action) }?;

        let previous_armed = ARMED.swap(true, Ordering::SeqCst);
        let previous_thread = ARMED_THREAD.swap(current_thread(), Ordering::SeqCst);
        let previous_pending = PENDING.swap(false, Ordering::SeqCst);

        let outer_expired =
            previous_armed && previous_pending && previous_thread == current_thread();
        let outer_bound = outer_expired || (!outer_left.is_zero() && outer_left < duration);
        let window = if outer_expired {
            PENDING.store(true, Ordering::SeqCst);
            Duration::ZERO
        } else if outer_bound {
            outer_left
        } else {
            duration
        };

        let previous_remaining = match set_timer(window) {
            Ok(remaining) => remaining,
            Err(errno) => {
                PENDING.store(previous_pending, Ordering::SeqCst);
                ARMED_THREAD.store(previous_thread, Ordering::SeqCst);
                ARMED.store(previous_armed, Ordering::SeqCst);
                unsafe {
                    let _ = sigaction(Signal::SIGALRM, &previous_action);
                }
                return Err(errno);
            }
        };

        debug!(
            limit_us = duration.as_micros() as u64,
            window_us = window.as_micros() as u64,
            nested = !previous_remaining.is_zero() || outer_expired,
            outer_bound,
            "alarm armed"
        );

        Ok(Self {
            previous_action,
            previous_remaining,
            previous_armed,
            previous_thread,
            previous_pending,
            outer_bound,
            armed_at: Instant::now(),
        })
    }

    /// Whether this guard's own window has run out
    ///
    /// Interruptible points still trip when an enclosing bound expires, but
    /// that expiry is reported by the enclosing guard.
    #[inline]
    pub fn fired(&self) -> bool {
        !self.outer_bound && PENDING.load(Ordering::SeqCst)
    }

    /// Time since the timer was armed
    pub fn elapsed(&self) -> Duration {
        self.armed_at.elapsed()
    }
}

impl Drop for AlarmGuard {
    fn drop(&mut self) {
        if let Err(errno) = set_timer(Duration::ZERO) {
            warn!(error = %errno, "failed to disarm interval timer");
        }

        let outer_fired =
            self.outer_bound && self.previous_armed && PENDING.load(Ordering::SeqCst);
        PENDING.store(self.previous_pending || outer_fired, Ordering::SeqCst);
        ARMED_THREAD.store(self.previous_thread, Ordering::SeqCst);
        ARMED.store(self.previous_armed, Ordering::SeqCst);
        drain_in_flight();

        if let Err(errno) = unsafe { sigaction(Signal::SIGALRM, &self.previous_action) } {
            warn!(error = %errno, "failed to restore previous SIGALRM handler");
        }

        if !outer_fired && !self.previous_remaining.is_zero() {
            // An outer timer whose time ran out while we held the slot fires
            // immediately.
            let left = self
                .previous_remaining
                .saturating_sub(self.armed_at.elapsed())
                .max(MIN_TIMER_INTERVAL);
            if let Err(errno) = set_timer(left) {
                warn!(error = %errno, "failed to re-arm outer interval timer");
            }
        }

        debug!(elapsed_us = self.armed_at.elapsed().as_micros() as u64, "alarm released");
    }
}
