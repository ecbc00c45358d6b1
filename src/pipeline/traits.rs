/*!
 * Pipeline Traits
 * Seams between executors and the stages layered on top of them
 */

use crate::core::errors::ErrorKind;

/// Timeout enforcement strategy
///
/// Runs `job` once, bounded by `seconds`. A falsy bound (`0.0`) runs the job
/// without enforcement.
pub trait Executor<T, K: ErrorKind>: Send + Sync {
    fn execute<J>(&self, seconds: f64, job: J) -> Result<T, K>
    where
        J: FnOnce() -> Result<T, K>;

    /// Strategy name for tracing
    fn strategy(&self) -> &'static str;
}

/// One layer of an assembled bounded call
///
/// `seconds` is the effective bound for this invocation: the configured
/// value, or the per-call override.
pub trait Stage<A, T, K: ErrorKind>: Send + Sync {
    fn invoke(&self, args: A, seconds: f64) -> Result<T, K>;

    /// Invoke, also reporting how many attempts of the wrapped function ran
    fn invoke_counted(&self, args: A, seconds: f64) -> (Result<T, K>, u32) {
        (self.invoke(args, seconds), 1)
    }
}
