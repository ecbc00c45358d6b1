/*!
 * Signals Module
 * SIGALRM-driven interruption of bounded calls
 */

mod alarm;
mod executor;

pub use alarm::{checkpoint, interrupt_pending, sleep, AlarmGuard};
pub use executor::AlarmExecutor;
