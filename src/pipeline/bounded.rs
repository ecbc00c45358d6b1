/*!
 * Bounded Function
 * The callable produced by wrapping a function with a time limit
 */

use super::config::ExecutionConfig;
use super::traits::Stage;
use crate::core::errors::{ErrorKind, TimeoutError};
use crate::monitoring::{CallSpan, PipelineStats};
use std::fmt;
use std::sync::Arc;

/// A function call with a wall-clock ceiling
///
/// Produced by [`TimeoutBuilder::wrap`](super::TimeoutBuilder::wrap). Keeps the
/// wrapped function's name and documentation for introspection.
pub struct BoundedFn<A, T, K = TimeoutError> {
    pub(super) pipeline: Box<dyn Stage<A, T, K>>,
    pub(super) config: ExecutionConfig,
    pub(super) name: String,
    pub(super) doc: Option<String>,
    pub(super) strategy: &'static str,
    pub(super) stats: Arc<PipelineStats>,
}

impl<A, T, K: ErrorKind> BoundedFn<A, T, K> {
    /// Invoke with the configured bound
    pub fn call(&self, args: A) -> Result<T, K> {
        self.call_with_timeout(args, self.config.total_seconds)
    }

    /// Invoke with `seconds` as the bound for this call only
    ///
    /// `0.0` (or any non-positive value) runs the call without enforcement.
    /// Each attempt made by the retry loop gets the full `seconds` window.
    pub fn call_with_timeout(&self, args: A, seconds: f64) -> Result<T, K> {
        self.stats.inc_calls();

        let span = CallSpan::new(&self.name, self.strategy, seconds);
        let _entered = span.enter();

        let (outcome, attempts) = self.pipeline.invoke_counted(args, seconds);

        span.record_attempts(u64::from(attempts));
        span.record_outcome(match outcome {
            Ok(_) => "ok",
            Err(ref err) if err.is_timeout() => "timeout",
            Err(_) => "error",
        });
        outcome
    }

    /// Name of the wrapped function
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation attached with `documented`
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Strategy name: "alarm" or "worker"
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// Counters shared by every stage of this call
    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }
}

impl<A, T, K> fmt::Debug for BoundedFn<A, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedFn")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
