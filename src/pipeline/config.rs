/*!
 * Execution Config
 * Validated, immutable view of a bounded call's configuration
 */

use serde::{Deserialize, Serialize};

/// Layers an assembled call is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    /// Executor only
    Bare,

    /// Executor wrapped in timeout recovery
    Recover,

    /// Bounded retry loop, recovery on the final attempt
    Retry,
}

impl PipelineShape {
    pub(crate) fn select(retries: u32, has_fallback: bool) -> Self {
        match (retries, has_fallback) {
            (0, false) => Self::Bare,
            (0, true) => Self::Recover,
            _ => Self::Retry,
        }
    }
}

/// Configuration closed over by a bounded call
///
/// Built once when the call is wrapped. Only `total_seconds` can be overridden,
/// and only for a single invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Resolved bound; `0.0` disables enforcement
    pub total_seconds: f64,

    pub use_worker_strategy: bool,

    /// Literal message attached to timeout errors
    pub error_message: Option<String>,

    pub retries: u32,
    pub has_fallback: bool,
    pub shape: PipelineShape,
}

impl ExecutionConfig {
    /// Whether calls are bounded unless overridden
    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.total_seconds > 0.0
    }

    /// Total attempts a call may make
    #[inline]
    pub fn max_attempts(&self) -> u64 {
        u64::from(self.retries) + 1
    }
}
