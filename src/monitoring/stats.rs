/*!
 * Lock-Free Pipeline Statistics
 * Atomic counters updated by every stage of a bounded call
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic pipeline statistics for lock-free updates
///
/// Cache-line aligned to prevent false sharing between pipelines that are
/// invoked from different threads.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct PipelineStats {
    calls: AtomicU64,
    attempts: AtomicU64,
    timeouts: AtomicU64,
    retries: AtomicU64,
    fallbacks: AtomicU64,
    alarms_fired: AtomicU64,
    workers_spawned: AtomicU64,
    workers_killed: AtomicU64,
}

impl PipelineStats {
    /// Create zeroed stats
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// One invocation of the bounded call (any number of attempts)
    #[inline(always)]
    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// One run of the wrapped function under an executor
    #[inline(always)]
    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// An attempt ended with the configured timeout kind
    #[inline(always)]
    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// A timed-out attempt was followed by a fresh one
    #[inline(always)]
    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// The on-timeout fallback produced the result
    #[inline(always)]
    pub fn inc_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_alarms_fired(&self) {
        self.alarms_fired.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_workers_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_workers_killed(&self) {
        self.workers_killed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats (no locks required)
    ///
    /// Values may be mutually inconsistent under concurrent updates; each
    /// individual counter is accurate.
    #[inline]
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            calls: self.calls.load(Ordering::Acquire),
            attempts: self.attempts.load(Ordering::Acquire),
            timeouts: self.timeouts.load(Ordering::Acquire),
            retries: self.retries.load(Ordering::Acquire),
            fallbacks: self.fallbacks.load(Ordering::Acquire),
            alarms_fired: self.alarms_fired.load(Ordering::Acquire),
            workers_spawned: self.workers_spawned.load(Ordering::Acquire),
            workers_killed: self.workers_killed.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatsSnapshot {
    pub calls: u64,
    pub attempts: u64,
    pub timeouts: u64,
    pub retries: u64,
    pub fallbacks: u64,
    pub alarms_fired: u64,
    pub workers_spawned: u64,
    pub workers_killed: u64,
}
