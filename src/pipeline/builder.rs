/*!
 * Timeout Builder
 * Validates configuration, resolves the bound and assembles the stages
 *
 * Everything that can be wrong with a configuration is reported by
 * [`TimeoutBuilder::wrap`], before the wrapped function ever runs.
 */

use super::bounded::BoundedFn;
use super::config::{ExecutionConfig, PipelineShape};
use super::stages::{ExecutorStage, Fallback, RecoveryStage, RetryStage};
use super::traits::{Executor, Stage};
use crate::core::errors::{ConfigError, ConfigResult, ErrorKind, TimeoutError};
use crate::limit::{resolve, TimeSpec};
use crate::monitoring::PipelineStats;
use crate::process::WorkerExecutor;
use crate::signals::AlarmExecutor;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Executor selected by the `use_signals` flag
#[derive(Debug, Clone)]
pub enum Strategy {
    Alarm(AlarmExecutor),
    Worker(WorkerExecutor),
}

impl<T, K> Executor<T, K> for Strategy
where
    T: Serialize + DeserializeOwned,
    K: ErrorKind + Serialize + DeserializeOwned,
{
    fn execute<J>(&self, seconds: f64, job: J) -> Result<T, K>
    where
        J: FnOnce() -> Result<T, K>,
    {
        match self {
            Self::Alarm(executor) => executor.execute(seconds, job),
            Self::Worker(executor) => executor.execute(seconds, job),
        }
    }

    fn strategy(&self) -> &'static str {
        match self {
            Self::Alarm(executor) => <AlarmExecutor as Executor<T, K>>::strategy(executor),
            Self::Worker(executor) => <WorkerExecutor as Executor<T, K>>::strategy(executor),
        }
    }
}

/// Start configuring a bounded call
///
/// ```no_run
/// use timebox::{timeout, TimeoutError};
///
/// let add = timeout()
///     .seconds(0.1)
///     .wrap(|(i, j): (i32, i32)| Ok::<_, TimeoutError>(i + j))?;
/// assert_eq!(add.call((1, 2)), Ok(3));
/// # Ok::<(), timebox::ConfigError>(())
/// ```
pub fn timeout<T, K: ErrorKind>() -> TimeoutBuilder<T, K> {
    TimeoutBuilder::new()
}

/// Builder for [`BoundedFn`]
pub struct TimeoutBuilder<T, K = TimeoutError> {
    limit: Option<TimeSpec>,
    seconds: Option<f64>,
    minutes: Option<f64>,
    hours: Option<f64>,
    use_signals: bool,
    error_message: Option<String>,
    retries: i64,
    fallback: Option<Fallback<T, K>>,
    name: Option<String>,
    doc: Option<String>,
    stats: Option<Arc<PipelineStats>>,
    poll_interval: Option<Duration>,
}

impl<T, K: ErrorKind> Default for TimeoutBuilder<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: ErrorKind> TimeoutBuilder<T, K> {
    /// Unbounded, alarm strategy, no retries, no fallback
    pub fn new() -> Self {
        Self {
            limit: None,
            seconds: None,
            minutes: None,
            hours: None,
            use_signals: true,
            error_message: None,
            retries: 0,
            fallback: None,
            name: None,
            doc: None,
            stats: None,
            poll_interval: None,
        }
    }

    /// Primary bound: seconds, a `Duration` or an absolute deadline
    pub fn limit(mut self, limit: impl Into<TimeSpec>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn seconds(mut self, seconds: f64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub fn minutes(mut self, minutes: f64) -> Self {
        self.minutes = Some(minutes);
        self
    }

    pub fn hours(mut self, hours: f64) -> Self {
        self.hours = Some(hours);
        self
    }

    /// `true` selects the alarm strategy (default), `false` the worker strategy
    pub fn use_signals(mut self, use_signals: bool) -> Self {
        self.use_signals = use_signals;
        self
    }

    pub fn use_worker_strategy(self) -> Self {
        self.use_signals(false)
    }

    /// Literal message attached to timeout errors
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Extra attempts after an initial timeout (must be >= 0)
    pub fn retries(mut self, retries: i64) -> Self {
        self.retries = retries;
        self
    }

    /// Return `fallback()` instead of a timeout error
    pub fn on_timeout<G>(mut self, fallback: G) -> Self
    where
        G: Fn() -> Result<T, K> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Return `fallback(args)` instead of a timeout error
    ///
    /// `args` is cloned for every invocation of the fallback.
    pub fn on_timeout_with<B, G>(mut self, fallback: G, args: B) -> Self
    where
        B: Clone + Send + Sync + 'static,
        G: Fn(B) -> Result<T, K> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(move || fallback(args.clone())));
        self
    }

    /// Override the name reported by [`BoundedFn::name`]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach documentation reported by [`BoundedFn::doc`]
    pub fn documented(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Share counters with other bounded calls
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Poll interval of the worker strategy
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Validate and resolve without wrapping anything
    ///
    /// Retries are checked before the bound is resolved, so a bad retry count
    /// is reported even when the limit is also invalid.
    pub fn config(&self) -> ConfigResult<ExecutionConfig> {
        if self.retries < 0 {
            return Err(ConfigError::NegativeRetries(self.retries));
        }
        let retries = u32::try_from(self.retries).unwrap_or(u32::MAX);
        let total_seconds = resolve(self.limit, self.seconds, self.minutes, self.hours)?;
        let has_fallback = self.fallback.is_some();

        Ok(ExecutionConfig {
            total_seconds,
            use_worker_strategy: !self.use_signals,
            error_message: self.error_message.clone(),
            retries,
            has_fallback,
            shape: PipelineShape::select(retries, has_fallback),
        })
    }

    /// Wrap `function`, selecting the strategy from `use_signals`
    pub fn wrap<A, F>(self, function: F) -> ConfigResult<BoundedFn<A, T, K>>
    where
        A: Clone + 'static,
        T: Serialize + DeserializeOwned + 'static,
        K: Serialize + DeserializeOwned,
        F: Fn(A) -> Result<T, K> + Send + Sync + 'static,
    {
        let config = self.config()?;
        let stats = self.stats.clone().unwrap_or_default();
        let message = config.error_message.as_deref();

        let executor = if config.use_worker_strategy {
            let worker = WorkerExecutor::new(message).with_stats(Arc::clone(&stats));
            Strategy::Worker(match self.poll_interval {
                Some(interval) => worker.with_poll_interval(interval),
                None => worker,
            })
        } else {
            Strategy::Alarm(AlarmExecutor::new(message).with_stats(Arc::clone(&stats)))
        };

        Ok(self.assemble(config, stats, executor, function))
    }

    /// Wrap `function` under the alarm strategy
    ///
    /// For results or error kinds that cannot be serialized, such as
    /// `std::io::Error`. Fails if the worker strategy was requested.
    pub fn wrap_in_process<A, F>(self, function: F) -> ConfigResult<BoundedFn<A, T, K>>
    where
        A: Clone + 'static,
        T: 'static,
        F: Fn(A) -> Result<T, K> + Send + Sync + 'static,
    {
        let config = self.config()?;
        if config.use_worker_strategy {
            return Err(ConfigError::WorkerUnavailable);
        }
        let stats = self.stats.clone().unwrap_or_default();
        let executor =
            AlarmExecutor::new(config.error_message.as_deref()).with_stats(Arc::clone(&stats));

        Ok(self.assemble(config, stats, executor, function))
    }

    fn assemble<A, F, E>(
        self,
        config: ExecutionConfig,
        stats: Arc<PipelineStats>,
        executor: E,
        function: F,
    ) -> BoundedFn<A, T, K>
    where
        A: Clone + 'static,
        T: 'static,
        F: Fn(A) -> Result<T, K> + Send + Sync + 'static,
        E: Executor<T, K> + 'static,
    {
        let name = self
            .name
            .unwrap_or_else(|| std::any::type_name::<F>().to_string());
        let strategy = executor.strategy();
        let base = ExecutorStage::new(function, executor, Arc::clone(&stats));

        let pipeline: Box<dyn Stage<A, T, K>> = match config.shape {
            PipelineShape::Bare => Box::new(base),
            PipelineShape::Recover => Box::new(RecoveryStage::new(
                base,
                self.fallback,
                Arc::clone(&stats),
            )),
            PipelineShape::Retry => Box::new(RetryStage::new(
                RecoveryStage::new(base, self.fallback, Arc::clone(&stats)),
                config.retries,
                Arc::clone(&stats),
            )),
        };

        info!(
            function = %name,
            strategy,
            limit_s = config.total_seconds,
            retries = config.retries,
            fallback = config.has_fallback,
            "bounded call assembled"
        );

        BoundedFn {
            pipeline,
            config,
            name,
            doc: self.doc,
            strategy,
            stats,
        }
    }
}
