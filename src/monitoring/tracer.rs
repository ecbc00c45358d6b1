/*!
 * Call Tracing
 * Structured tracing for bounded calls using the tracing crate
 *
 * Every invocation of a bounded function opens a `CallSpan` carrying a trace
 * id, the function name and the strategy. Attempts and the final outcome are
 * recorded on the span; slow calls are reported at warn level when it closes.
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Calls running longer than this are logged as slow when their span closes
const SLOW_CALL_THRESHOLD: Duration = Duration::from_secs(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - TIMEBOX_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("TIMEBOX_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "timebox tracing initialized");
    }
}

/// Generate a unique trace ID for call correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one invocation of a bounded call
pub struct CallSpan {
    span: tracing::Span,
    start: Instant,
    function: String,
    trace_id: String,
}

impl CallSpan {
    pub fn new(function: &str, strategy: &'static str, limit_seconds: f64) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "bounded_call",
            trace_id = %trace_id,
            function = function,
            strategy = strategy,
            limit_s = limit_seconds,
            attempts = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        span.in_scope(|| debug!(function, strategy, limit_s = limit_seconds, "call started"));

        Self {
            span,
            start: Instant::now(),
            function: function.to_string(),
            trace_id,
        }
    }

    /// Get the trace ID for this call
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record how many attempts the call took
    pub fn record_attempts(&self, attempts: u64) {
        self.span.record("attempts", attempts);
    }

    /// Record the outcome: "ok", "timeout" or "error"
    pub fn record_outcome(&self, outcome: &'static str) {
        self.span.record("outcome", outcome);
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration > SLOW_CALL_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                function = %self.function,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow bounded call"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                function = %self.function,
                duration_us = duration.as_micros() as u64,
                "call completed"
            );
        }
    }
}
