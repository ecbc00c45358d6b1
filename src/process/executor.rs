/*!
 * Worker Executor
 * Out-of-process, polling-driven timeout strategy
 *
 * The deadline is computed once, when the worker is spawned. The caller then
 * waits on the result channel in slices of at most `POLL_INTERVAL`, so the
 * delivered bound is the configured one plus at most one interval.
 */

use super::types::ExecutionResult;
use super::worker::{Slot, Worker};
use crate::core::errors::ErrorKind;
use crate::core::limits::POLL_INTERVAL;
use crate::limit::as_duration;
use crate::monitoring::PipelineStats;
use crate::pipeline::traits::Executor;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Process-based executor
#[derive(Debug, Clone)]
pub struct WorkerExecutor {
    message: Option<Arc<str>>,
    poll_interval: Duration,
    stats: Option<Arc<PipelineStats>>,
}

impl Default for WorkerExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WorkerExecutor {
    /// Create executor raising timeouts with `message`
    pub fn new(message: Option<&str>) -> Self {
        Self {
            message: message.map(Arc::from),
            poll_interval: POLL_INTERVAL,
            stats: None,
        }
    }

    /// Report spawned and killed workers to `stats`
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Override the poll interval (defaults to `POLL_INTERVAL`)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Message attached to timeout errors
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Drive `worker` until its slot is published or `deadline` passes
    fn wait_for<T, K>(&self, worker: &mut Worker, deadline: Option<Instant>) -> Result<T, K>
    where
        T: DeserializeOwned,
        K: ErrorKind + DeserializeOwned,
    {
        loop {
            let wait = match deadline {
                Some(at) => at
                    .saturating_duration_since(Instant::now())
                    .min(self.poll_interval),
                None => self.poll_interval,
            };

            match worker.receive::<T, K>(wait) {
                Slot::Published(ExecutionResult::Success(value)) => return Ok(value),
                Slot::Published(ExecutionResult::Failure(err)) => return Err(err),
                Slot::Published(ExecutionResult::Panicked(message)) => {
                    warn!(%message, "worker panicked, resuming panic in caller");
                    std::panic::resume_unwind(Box::new(message));
                }
                Slot::Published(ExecutionResult::Unserializable(reason)) => {
                    // Counts as an unpublished slot: surfaces as a timeout below.
                    warn!(%reason, "worker result cannot cross the process boundary");
                }
                Slot::Empty => {}
            }

            match deadline {
                Some(at) if Instant::now() >= at => self.cancel::<K>(worker)?,
                None if !worker.channel_open() && !worker.is_alive() => self.cancel::<K>(worker)?,
                _ => {}
            }
        }
    }

    #[cold]
    fn cancel<K: ErrorKind>(&self, worker: &mut Worker) -> Result<(), K> {
        let alive = worker.is_alive();
        let outcome = worker.cancel::<K>(self.message());
        if alive {
            if let Some(ref stats) = self.stats {
                stats.inc_workers_killed();
            }
        }
        outcome
    }
}

impl<T, K> Executor<T, K> for WorkerExecutor
where
    T: Serialize + DeserializeOwned,
    K: ErrorKind + Serialize + DeserializeOwned,
{
    fn execute<J>(&self, seconds: f64, job: J) -> Result<T, K>
    where
        J: FnOnce() -> Result<T, K>,
    {
        let limit = as_duration(seconds);

        let mut worker = Worker::spawn(job).map_err(K::execution_fault)?;
        let deadline = limit.map(|d| Instant::now() + d);

        if let Some(ref stats) = self.stats {
            stats.inc_workers_spawned();
        }
        debug!(
            pid = worker.pid().map(|p| p.as_raw()),
            limit_ms = limit.map(|d| d.as_millis() as u64),
            "waiting for worker result"
        );

        self.wait_for(&mut worker, deadline)
    }

    fn strategy(&self) -> &'static str {
        "worker"
    }
}
