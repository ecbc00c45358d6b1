/*!
 * Timebox
 * Wall-clock bounds for arbitrary function calls
 *
 * A wrapped function runs under one of two strategies:
 *
 * - **alarm** (default): in the caller's thread, under a one-shot `ITIMER_REAL`.
 *   The call is cut short at its next interruptible point ([`checkpoint`],
 *   [`sleep`], or any blocking syscall, which fails with `EINTR`).
 * - **worker**: in a forked process that is killed when the deadline passes.
 *   Results and errors cross back through a versioned bincode frame.
 *
 * On timeout the call returns the configured error kind, or the fallback's
 * value, optionally after a bounded number of fresh attempts.
 *
 * ```no_run
 * use std::time::Duration;
 * use timebox::{timeout, TimeoutError};
 *
 * let slow = timeout()
 *     .seconds(0.1)
 *     .error_message("Timeout exceeded.")
 *     .wrap(|secs: u64| {
 *         timebox::sleep(Duration::from_secs(secs))?;
 *         Ok::<_, TimeoutError>(secs)
 *     })?;
 *
 * let err = slow.call(2).unwrap_err();
 * assert_eq!(err.to_string(), "Timeout exceeded.");
 * # Ok::<(), timebox::ConfigError>(())
 * ```
 */

#[cfg(not(unix))]
compile_error!("timebox relies on SIGALRM and fork(2) and only supports unix targets");

pub mod core;
pub mod limit;
pub mod monitoring;
pub mod pipeline;
pub mod process;
pub mod signals;

// Re-exports
pub use crate::core::errors::{
    ConfigError, ConfigResult, ErrorKind, ExecutionFault, Interrupted, TimeoutError,
};
pub use limit::{resolve, TimeSpec};
pub use monitoring::{init_tracing, PipelineStats, PipelineStatsSnapshot};
pub use pipeline::{
    timeout, BoundedFn, ExecutionConfig, PipelineShape, TimeoutBuilder, TimeoutSettings,
};
pub use process::{ExecutionResult, WorkerExecutor};
pub use signals::{checkpoint, interrupt_pending, sleep, AlarmExecutor};
