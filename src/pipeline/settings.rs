/*!
 * Timeout Settings
 *
 * Declarative form of the builder options, loadable from JSON and overridable
 * from the environment.
 *
 * ```json
 * {
 *   "limit": "2030-01-01T00:00:00Z",
 *   "seconds": 1.5,
 *   "use_signals": false,
 *   "error_message": "Timeout exceeded.",
 *   "retries": 2
 * }
 * ```
 *
 * `limit` is either a number of seconds or an RFC 3339 deadline. `retries` is
 * kept as a raw JSON number so that `1.1` is reported as a non-integer rather
 * than rejected by the parser.
 */

use super::builder::TimeoutBuilder;
use crate::core::errors::{ConfigError, ConfigResult, ErrorKind};
use crate::core::limits::{
    AGGRESSIVE_CALL_TIMEOUT, RELAXED_CALL_TIMEOUT, RELAXED_RETRIES, STANDARD_CALL_TIMEOUT,
};
use crate::limit::TimeSpec;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

/// Overrides the resolved `seconds` component
pub const ENV_SECONDS: &str = "TIMEBOX_SECONDS";
/// Overrides `retries`
pub const ENV_RETRIES: &str = "TIMEBOX_RETRIES";
/// Overrides `use_signals` ("1"/"true" or "0"/"false")
pub const ENV_USE_SIGNALS: &str = "TIMEBOX_USE_SIGNALS";

/// Primary bound as written in a settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitSetting {
    Seconds(f64),
    /// RFC 3339 timestamp
    Deadline(String),
}

impl LimitSetting {
    fn to_spec(&self) -> ConfigResult<TimeSpec> {
        match self {
            Self::Seconds(seconds) => Ok(TimeSpec::Seconds(*seconds)),
            Self::Deadline(text) => OffsetDateTime::parse(text, &Rfc3339)
                .map(TimeSpec::from)
                .map_err(|e| ConfigError::InvalidSettings(format!("limit {text:?}: {e}"))),
        }
    }
}

/// Serializable timeout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    pub limit: Option<LimitSetting>,
    pub seconds: Option<f64>,
    pub minutes: Option<f64>,
    pub hours: Option<f64>,
    pub use_signals: bool,
    pub error_message: Option<String>,
    pub retries: Option<Number>,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TimeoutSettings {
    /// Standard bound, alarm strategy, no retries
    pub fn new() -> Self {
        Self::with_seconds(STANDARD_CALL_TIMEOUT)
    }

    /// No bound at all
    pub fn disabled() -> Self {
        Self {
            limit: None,
            seconds: None,
            minutes: None,
            hours: None,
            use_signals: true,
            error_message: None,
            retries: None,
        }
    }

    /// Short bound for development
    pub fn aggressive() -> Self {
        Self::with_seconds(AGGRESSIVE_CALL_TIMEOUT)
    }

    /// Long bound with retries for slow environments
    pub fn relaxed() -> Self {
        Self {
            retries: Some(Number::from(RELAXED_RETRIES)),
            ..Self::with_seconds(RELAXED_CALL_TIMEOUT)
        }
    }

    fn with_seconds(seconds: f64) -> Self {
        Self {
            seconds: Some(seconds),
            ..Self::disabled()
        }
    }

    /// Parse a JSON settings document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// Load a JSON settings file
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded timeout settings");
        Self::from_json_str(&text)
    }

    /// Apply `TIMEBOX_*` environment overrides
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        if let Some(raw) = lookup(ENV_SECONDS) {
            let seconds = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::InvalidSettings(format!("{ENV_SECONDS}={raw:?}: {e}")))?;
            self.seconds = Some(seconds);
        }

        if let Some(raw) = lookup(ENV_RETRIES) {
            let retries: Number = serde_json::from_str(raw.trim())
                .map_err(|e| ConfigError::InvalidSettings(format!("{ENV_RETRIES}={raw:?}: {e}")))?;
            self.retries = Some(retries);
        }

        if let Some(raw) = lookup(ENV_USE_SIGNALS) {
            self.use_signals = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidSettings(format!(
                        "{ENV_USE_SIGNALS}={raw:?}: expected a boolean"
                    )))
                }
            };
        }
        Ok(self)
    }

    /// Retry count as an integer
    ///
    /// Any JSON number with a fractional representation (`1.1`, `2.0`) is
    /// rejected as a non-integer.
    pub fn retries(&self) -> ConfigResult<i64> {
        match self.retries {
            None => Ok(0),
            Some(ref number) => {
                if let Some(n) = number.as_i64() {
                    Ok(n)
                } else if number.is_u64() {
                    Ok(i64::MAX)
                } else {
                    Err(ConfigError::NonIntegerRetries(number.to_string()))
                }
            }
        }
    }

    /// Validate into a builder
    pub fn into_builder<T, K: ErrorKind>(self) -> ConfigResult<TimeoutBuilder<T, K>> {
        let retries = self.retries()?;

        let mut builder = TimeoutBuilder::new()
            .use_signals(self.use_signals)
            .retries(retries);
        if let Some(ref limit) = self.limit {
            builder = builder.limit(limit.to_spec()?);
        }
        if let Some(seconds) = self.seconds {
            builder = builder.seconds(seconds);
        }
        if let Some(minutes) = self.minutes {
            builder = builder.minutes(minutes);
        }
        if let Some(hours) = self.hours {
            builder = builder.hours(hours);
        }
        if let Some(message) = self.error_message {
            builder = builder.error_message(message);
        }
        Ok(builder)
    }
}
