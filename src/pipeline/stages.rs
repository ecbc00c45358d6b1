/*!
 * Pipeline Stages
 *
 * A bounded call is assembled from at most three layers, innermost first:
 *
 * - [`ExecutorStage`]: one attempt of the wrapped function under the chosen
 *   executor, with a fresh timeout window.
 * - [`RecoveryStage`]: substitutes the fallback for a timeout. Without a
 *   fallback it only passes results through.
 * - [`RetryStage`]: an explicit bounded loop of `retries + 1` attempts. Only
 *   the final attempt goes through recovery.
 *
 * Interception keys on [`ErrorKind::is_timeout`], so an error returned by the
 * wrapped function that reports itself as a timeout is recovered and retried
 * exactly like an expired limit.
 */

use super::traits::{Executor, Stage};
use crate::core::errors::ErrorKind;
use crate::monitoring::PipelineStats;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fallback invoked in place of a timeout error
pub type Fallback<T, K> = Arc<dyn Fn() -> Result<T, K> + Send + Sync>;

/// Single attempt of the wrapped function under an executor
pub struct ExecutorStage<F, E> {
    function: F,
    executor: E,
    stats: Arc<PipelineStats>,
}

impl<F, E> ExecutorStage<F, E> {
    pub fn new(function: F, executor: E, stats: Arc<PipelineStats>) -> Self {
        Self {
            function,
            executor,
            stats,
        }
    }
}

impl<A, T, K, F, E> Stage<A, T, K> for ExecutorStage<F, E>
where
    K: ErrorKind,
    F: Fn(A) -> Result<T, K> + Send + Sync,
    E: Executor<T, K>,
{
    fn invoke(&self, args: A, seconds: f64) -> Result<T, K> {
        self.stats.inc_attempts();

        let outcome = self.executor.execute(seconds, || (self.function)(args));

        if let Err(ref err) = outcome {
            if err.is_timeout() {
                self.stats.inc_timeouts();
                debug!(
                    strategy = self.executor.strategy(),
                    limit_s = seconds,
                    "attempt timed out"
                );
            }
        }
        outcome
    }
}

/// Timeout interception around an inner stage
pub struct RecoveryStage<S, T, K> {
    inner: S,
    fallback: Option<Fallback<T, K>>,
    stats: Arc<PipelineStats>,
}

impl<S, T, K> RecoveryStage<S, T, K> {
    pub fn new(inner: S, fallback: Option<Fallback<T, K>>, stats: Arc<PipelineStats>) -> Self {
        Self {
            inner,
            fallback,
            stats,
        }
    }
}

impl<S, T, K: ErrorKind> RecoveryStage<S, T, K> {
    /// Run one attempt
    ///
    /// A timeout on a non-final attempt is returned as is so the caller can try
    /// again. On the final attempt it is replaced by the fallback when one is
    /// configured.
    pub fn attempt<A>(&self, args: A, seconds: f64, last: bool) -> Result<T, K>
    where
        S: Stage<A, T, K>,
    {
        let outcome = self.inner.invoke(args, seconds);
        if let (true, Err(err), Some(fallback)) = (last, &outcome, &self.fallback) {
            if err.is_timeout() {
                self.stats.inc_fallbacks();
                debug!(error = %err, "timeout intercepted, invoking fallback");
                return fallback();
            }
        }
        outcome
    }
}

impl<A, S, T, K> Stage<A, T, K> for RecoveryStage<S, T, K>
where
    S: Stage<A, T, K>,
    K: ErrorKind,
{
    fn invoke(&self, args: A, seconds: f64) -> Result<T, K> {
        self.attempt(args, seconds, true)
    }
}

/// Bounded loop of attempts with recovery on the last one
pub struct RetryStage<S, T, K> {
    recovery: RecoveryStage<S, T, K>,
    retries: u32,
    stats: Arc<PipelineStats>,
}

impl<S, T, K> RetryStage<S, T, K> {
    pub fn new(recovery: RecoveryStage<S, T, K>, retries: u32, stats: Arc<PipelineStats>) -> Self {
        Self {
            recovery,
            retries,
            stats,
        }
    }
}

impl<A, S, T, K> Stage<A, T, K> for RetryStage<S, T, K>
where
    A: Clone,
    S: Stage<A, T, K>,
    K: ErrorKind,
{
    fn invoke(&self, args: A, seconds: f64) -> Result<T, K> {
        self.invoke_counted(args, seconds).0
    }

    fn invoke_counted(&self, args: A, seconds: f64) -> (Result<T, K>, u32) {
        let mut attempt: u32 = 0;
        loop {
            let last = attempt >= self.retries;
            let outcome = self.recovery.attempt(args.clone(), seconds, last);

            match outcome {
                Err(ref err) if !last && err.is_timeout() => {
                    attempt += 1;
                    self.stats.inc_retries();
                    debug!(attempt, retries = self.retries, "retrying after timeout");
                }
                other => {
                    let attempts = attempt.saturating_add(1);
                    if matches!(other, Err(ref err) if err.is_timeout()) {
                        warn!(attempts, "all attempts timed out");
                    }
                    return (other, attempts);
                }
            }
        }
    }
}
