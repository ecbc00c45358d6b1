/*!
 * Alarm Executor
 * In-process, interrupt-driven timeout strategy
 *
 * Runs the job synchronously on the caller's thread with a one-shot
 * `ITIMER_REAL` armed for the effective bound. Preemption is best-effort: the
 * job is cut short at its next interruptible point, and a job that never
 * reaches one runs to completion before the timeout is reported.
 */

use super::alarm::AlarmGuard;
use crate::core::errors::{ErrorKind, ExecutionFault};
use crate::limit::as_duration;
use crate::monitoring::PipelineStats;
use crate::pipeline::traits::Executor;
use std::sync::Arc;
use tracing::warn;

/// Interrupt-driven executor
#[derive(Debug, Clone, Default)]
pub struct AlarmExecutor {
    message: Option<Arc<str>>,
    stats: Option<Arc<PipelineStats>>,
}

impl AlarmExecutor {
    /// Create executor raising timeouts with `message`
    pub fn new(message: Option<&str>) -> Self {
        Self {
            message: message.map(Arc::from),
            stats: None,
        }
    }

    /// Report fired alarms to `stats`
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Message attached to timeout errors
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[cold]
    #[inline(never)]
    fn handle_timeout<K: ErrorKind>(&self, guard: &AlarmGuard) -> K {
        if let Some(ref stats) = self.stats {
            stats.inc_alarms_fired();
        }
        warn!(
            elapsed_ms = guard.elapsed().as_millis() as u64,
            "alarm fired, aborting call"
        );
        K::timed_out(self.message())
    }
}

impl<T, K: ErrorKind> Executor<T, K> for AlarmExecutor {
    fn execute<J>(&self, seconds: f64, job: J) -> Result<T, K>
    where
        J: FnOnce() -> Result<T, K>,
    {
        let Some(limit) = as_duration(seconds) else {
            return job();
        };

        let guard = AlarmGuard::arm(limit)
            .map_err(|errno| K::execution_fault(ExecutionFault::Alarm(errno.to_string())))?;

        let outcome = job();

        if guard.fired() {
            let err = self.handle_timeout(&guard);
            drop(guard);
            return Err(err);
        }

        drop(guard);
        outcome
    }

    fn strategy(&self) -> &'static str {
        "alarm"
    }
}
