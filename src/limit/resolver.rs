/*!
 * Time Limit Resolution
 *
 * A bound can be given as a plain number of seconds, a `Duration`, or an
 * absolute deadline, plus independent `seconds`/`minutes`/`hours` components.
 * Everything collapses to one `f64` of seconds; `0.0` means "no timeout".
 *
 * ## Deadlines
 *
 * An absolute deadline is reduced to "seconds until deadline" when `resolve`
 * runs, i.e. when the bounded call is built, not when it is invoked. A call
 * built long before it runs has already lost part of its window.
 *
 * ## Example
 *
 * ```
 * use std::time::Duration;
 * use timebox::limit::{resolve, TimeSpec};
 *
 * let total = resolve(Some(TimeSpec::from(Duration::from_secs(1))), Some(0.5), Some(1.0), None)?;
 * assert_eq!(total, 61.5);
 * # Ok::<(), timebox::ConfigError>(())
 * ```
 */

use crate::core::errors::{ConfigError, ConfigResult};
use crate::core::limits::MAX_ENFORCED_WINDOW;
use std::time::{Duration, SystemTime};
use time::OffsetDateTime;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Primary time specification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpec {
    /// Plain seconds, fractions allowed
    Seconds(f64),

    /// Relative duration
    Duration(Duration),

    /// Absolute point in time
    Deadline(SystemTime),
}

impl TimeSpec {
    /// Seconds contributed by this specification, evaluated now
    ///
    /// A deadline in the past contributes a negative amount.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds(s) => *s,
            Self::Duration(d) => d.as_secs_f64(),
            Self::Deadline(at) => match at.duration_since(SystemTime::now()) {
                Ok(remaining) => remaining.as_secs_f64(),
                Err(passed) => -passed.duration().as_secs_f64(),
            },
        }
    }
}

impl From<f64> for TimeSpec {
    fn from(seconds: f64) -> Self {
        Self::Seconds(seconds)
    }
}

impl From<u64> for TimeSpec {
    fn from(seconds: u64) -> Self {
        Self::Seconds(seconds as f64)
    }
}

impl From<Duration> for TimeSpec {
    fn from(duration: Duration) -> Self {
        Self::Duration(duration)
    }
}

impl From<SystemTime> for TimeSpec {
    fn from(deadline: SystemTime) -> Self {
        Self::Deadline(deadline)
    }
}

impl From<OffsetDateTime> for TimeSpec {
    fn from(deadline: OffsetDateTime) -> Self {
        Self::Deadline(SystemTime::from(deadline))
    }
}

/// Resolve a limit and its additive components into total seconds
///
/// `seconds + minutes * 60 + hours * 3600` is always summed in alongside
/// `limit`. With no inputs at all the result is `0.0`. Totals that are
/// negative, not finite, or too large for a [`Duration`] are rejected.
pub fn resolve(
    limit: Option<TimeSpec>,
    seconds: Option<f64>,
    minutes: Option<f64>,
    hours: Option<f64>,
) -> ConfigResult<f64> {
    let total = limit.map(|spec| spec.seconds()).unwrap_or(0.0)
        + seconds.unwrap_or(0.0)
        + minutes.unwrap_or(0.0) * SECONDS_PER_MINUTE
        + hours.unwrap_or(0.0) * SECONDS_PER_HOUR;

    if Duration::try_from_secs_f64(total).is_err() {
        return Err(ConfigError::InvalidLimit(total));
    }
    Ok(total)
}

/// Convert resolved seconds into an enforceable duration
///
/// Zero, negative and NaN mean "no timeout" and yield `None`. Anything longer
/// than [`MAX_ENFORCED_WINDOW`] (including infinity) is clamped to it.
#[inline]
pub fn as_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds <= 0.0 {
        return None;
    }
    let window = Duration::try_from_secs_f64(seconds).unwrap_or(MAX_ENFORCED_WINDOW);
    Some(window.min(MAX_ENFORCED_WINDOW))
}
