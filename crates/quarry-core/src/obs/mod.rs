//! Observability: runtime telemetry (metrics) and the sink abstraction.
//!
//! Recording is observational only; nothing here feeds back into
//! query execution.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all};
