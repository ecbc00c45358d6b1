/*!
 * Pipeline
 * Assembly of executors, recovery and retry into one bounded callable
 */

mod bounded;
mod builder;
mod config;
mod settings;
mod stages;
pub mod traits;

pub use bounded::BoundedFn;
pub use builder::{timeout, Strategy, TimeoutBuilder};
pub use config::{ExecutionConfig, PipelineShape};
pub use settings::{LimitSetting, TimeoutSettings, ENV_RETRIES, ENV_SECONDS, ENV_USE_SIGNALS};
pub use stages::{ExecutorStage, Fallback, RecoveryStage, RetryStage};
pub use traits::{Executor, Stage};
