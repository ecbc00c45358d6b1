/*!
 * Timing Limits and Constants
 *
 * Centralized location for the intervals, slices and wire constants used by
 * both timeout strategies.
 */

use std::time::Duration;

// =============================================================================
// WORKER STRATEGY
// =============================================================================

/// Poll interval of the caller-side receive loop (10ms)
/// The delivered bound for the worker strategy is "limit + at most one interval"
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer used when draining the result channel (64KB)
pub const CHANNEL_READ_CHUNK: usize = 64 * 1024;

/// Exit code of a worker that published its result
pub const WORKER_EXIT_OK: i32 = 0;

/// Exit code of a worker that could not write to the result channel
pub const WORKER_EXIT_CHANNEL_FAILED: i32 = 70;

// =============================================================================
// ALARM STRATEGY
// =============================================================================

/// Longest uninterrupted nap taken by the interruptible `sleep`
/// Bounds the latency of a missed wakeup if the alarm lands between checks
pub const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Smallest interval handed to `setitimer`
/// A zero `it_value` disarms the timer, so tiny limits round up to this
pub const MIN_TIMER_INTERVAL: Duration = Duration::from_micros(1);

/// Longest window either strategy enforces (about 3 years)
/// Larger bounds are clamped so `setitimer` and deadline arithmetic never overflow
pub const MAX_ENFORCED_WINDOW: Duration = Duration::from_secs(100_000_000);

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Frame format version written by workers
pub const FRAME_FORMAT_VERSION: u8 = 1;

/// Frame header: 1-byte version + 4-byte little-endian payload length
pub const FRAME_HEADER_LEN: usize = 5;

/// Largest payload a worker may publish (256MB)
pub const MAX_FRAME_PAYLOAD: usize = 256 * 1024 * 1024;

// =============================================================================
// SETTINGS PRESETS
// =============================================================================

/// Bound used by `TimeoutSettings::new` (30s)
pub const STANDARD_CALL_TIMEOUT: f64 = 30.0;

/// Bound used by `TimeoutSettings::aggressive` (5s)
pub const AGGRESSIVE_CALL_TIMEOUT: f64 = 5.0;

/// Bound used by `TimeoutSettings::relaxed` (300s)
pub const RELAXED_CALL_TIMEOUT: f64 = 300.0;

/// Extra attempts granted by `TimeoutSettings::relaxed`
pub const RELAXED_RETRIES: u32 = 2;
