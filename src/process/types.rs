/*!
 * Process Types
 * Tagged results moved across the worker process boundary
 */

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of a job, as published by a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionResult<T, K> {
    /// The job returned a value
    Success(T),

    /// The job returned an error
    Failure(K),

    /// The job panicked; carries the panic message
    Panicked(String),

    /// The outcome could not be carried across the boundary
    Unserializable(String),
}

impl<T, K> ExecutionResult<T, K> {
    /// Run `job`, capturing panics as [`ExecutionResult::Panicked`]
    pub fn capture<J>(job: J) -> Self
    where
        J: FnOnce() -> Result<T, K>,
    {
        match catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(value)) => Self::Success(value),
            Ok(Err(err)) => Self::Failure(err),
            Err(payload) => Self::Panicked(panic_message(payload.as_ref())),
        }
    }

    /// Whether this result counts as a published slot
    pub fn is_published(&self) -> bool {
        !matches!(self, Self::Unserializable(_))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
