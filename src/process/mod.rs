/*!
 * Process Module
 * Forked workers and the polling timeout strategy built on them
 */

mod executor;
pub mod types;
mod worker;

pub use executor::WorkerExecutor;
pub use types::ExecutionResult;
pub use worker::{Slot, Worker};
