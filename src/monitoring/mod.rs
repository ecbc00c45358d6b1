/*!
 * Monitoring
 * Pipeline statistics and structured call tracing
 */

mod stats;
mod tracer;

pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use tracer::{generate_trace_id, init_tracing, CallSpan};
