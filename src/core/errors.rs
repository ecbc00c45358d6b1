/*!
 * Error Types
 * Configuration errors, the timeout error-kind contract and the default kind
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for decoration-time validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a bounded call, before any invocation
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum ConfigError {
    #[error("retries must be greater than or equal to 0")]
    #[diagnostic(
        code(config::negative_retries),
        help("Use 0 to run exactly one attempt.")
    )]
    NegativeRetries(i64),

    #[error("retries must be an integer")]
    #[diagnostic(
        code(config::non_integer_retries),
        help("Retries count whole extra attempts; fractional values are rejected.")
    )]
    NonIntegerRetries(String),

    #[error("time limit must resolve to a finite, non-negative number of seconds (got {0})")]
    #[diagnostic(
        code(config::invalid_limit),
        help("Check for negative components or a deadline that already passed.")
    )]
    InvalidLimit(f64),

    #[error("the worker strategy is not available for this call")]
    #[diagnostic(
        code(config::worker_unavailable),
        help("Results and errors must be serializable to cross the process boundary; wrap with `wrap` instead of `wrap_in_process`.")
    )]
    WorkerUnavailable,

    #[error("invalid timeout settings: {0}")]
    #[diagnostic(code(config::invalid_settings))]
    InvalidSettings(String),

    #[error("failed to read timeout settings from {path}: {reason}")]
    #[diagnostic(code(config::io), help("Verify the path exists and is readable."))]
    Io { path: String, reason: String },
}

/// Infrastructure failures unrelated to the wrapped function's own outcome
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionFault {
    #[error("failed to arm interval timer: {0}")]
    Alarm(String),

    #[error("failed to spawn worker process: {0}")]
    Spawn(String),

    #[error("result channel failed: {0}")]
    Channel(String),
}

/// Contract for the error kind raised when a bounded call runs out of time.
///
/// Bounding the kind by [`std::error::Error`] is what makes "must be an error
/// type" a compile-time property. The kind is also what recovery and retry
/// stages intercept: anything the wrapped function returns for which
/// [`ErrorKind::is_timeout`] holds is treated exactly like an expired limit.
///
/// A type that is not an error cannot be used as the kind:
///
/// ```compile_fail
/// struct NotAnError;
/// let _ = timebox::timeout::<(), NotAnError>();
/// ```
pub trait ErrorKind: std::error::Error + Send + Sized + 'static {
    /// Build the timeout error, carrying the configured message if any
    fn timed_out(message: Option<&str>) -> Self;

    /// Whether this error is the timeout kind
    fn is_timeout(&self) -> bool;

    /// Build the error reported when the enforcement machinery itself fails
    fn execution_fault(fault: ExecutionFault) -> Self;
}

/// Default error kind: a bare timeout with no message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutError {
    #[error("{}", .message.as_deref().unwrap_or("timed out"))]
    Elapsed { message: Option<String> },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Fault(#[from] ExecutionFault),
}

impl TimeoutError {
    /// Error for a wrapped function that failed on its own
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Message attached to a timeout, if one was configured
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Elapsed { message } => message.as_deref(),
            _ => None,
        }
    }
}

impl ErrorKind for TimeoutError {
    fn timed_out(message: Option<&str>) -> Self {
        Self::Elapsed {
            message: message.map(str::to_owned),
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, Self::Elapsed { .. })
    }

    fn execution_fault(fault: ExecutionFault) -> Self {
        Self::Fault(fault)
    }
}

// io::Error cannot cross the worker boundary (no serde), so it only works with
// the alarm strategy.
impl ErrorKind for std::io::Error {
    fn timed_out(message: Option<&str>) -> Self {
        std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            message.unwrap_or("timed out").to_owned(),
        )
    }

    fn is_timeout(&self) -> bool {
        self.kind() == std::io::ErrorKind::TimedOut
    }

    fn execution_fault(fault: ExecutionFault) -> Self {
        std::io::Error::other(fault)
    }
}

/// Returned by interruptible points once the armed alarm has fired
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupted by an expired time limit")]
pub struct Interrupted;

impl From<Interrupted> for TimeoutError {
    fn from(_: Interrupted) -> Self {
        Self::Elapsed { message: None }
    }
}

impl From<Interrupted> for std::io::Error {
    fn from(_: Interrupted) -> Self {
        std::io::Error::new(std::io::ErrorKind::Interrupted, Interrupted)
    }
}
