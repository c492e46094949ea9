//! Metrics sink boundary.
//!
//! Execution code MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{db::request::RequestFingerprint, error::ErrorClass, obs::metrics};
use std::cell::Cell;

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Fetch,
    Count,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity: &'static str,
        fingerprint: RequestFingerprint,
    },
    ExecFinish {
        kind: ExecKind,
        entity: &'static str,
        fingerprint: RequestFingerprint,
        rows: u64,
    },
    ExecError {
        kind: ExecKind,
        entity: &'static str,
        fingerprint: RequestFingerprint,
        class: Option<ErrorClass>,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
///
/// Default process-local sink that writes into the global metrics state.
/// Acts as the concrete sink when no scoped override is installed.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity, .. } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    match kind {
                        ExecKind::Fetch => {
                            m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                            entry.fetch_calls = entry.fetch_calls.saturating_add(1);
                        }
                        ExecKind::Count => {
                            m.ops.count_calls = m.ops.count_calls.saturating_add(1);
                            entry.count_calls = entry.count_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind, entity, rows, ..
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    match kind {
                        ExecKind::Fetch => {
                            m.ops.rows_fetched = m.ops.rows_fetched.saturating_add(rows);
                            entry.rows_fetched = entry.rows_fetched.saturating_add(rows);
                        }
                        ExecKind::Count => {
                            m.ops.rows_counted = m.ops.rows_counted.saturating_add(rows);
                            entry.rows_counted = entry.rows_counted.saturating_add(rows);
                        }
                    }
                });
            }

            MetricsEvent::ExecError { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.errors = m.ops.errors.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.errors = entry.errors.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    match SINK_OVERRIDE.with(Cell::get) {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub(crate) fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let _guard = Guard(prev);

    f()
}

///
/// Span
///
/// RAII guard that emits start/finish events for one backend call.
/// An errored span emits `ExecError` instead of `ExecFinish`.
///

pub(crate) struct Span {
    kind: ExecKind,
    entity: &'static str,
    fingerprint: RequestFingerprint,
    outcome: Outcome,
    finished: bool,
}

// What the finish event reports; a failure sticks once recorded.
#[derive(Clone, Copy, Debug)]
enum Outcome {
    Rows(u64),
    Failed(Option<ErrorClass>),
}

impl Span {
    #[must_use]
    pub(crate) fn new(
        kind: ExecKind,
        entity: &'static str,
        fingerprint: RequestFingerprint,
    ) -> Self {
        record(MetricsEvent::ExecStart {
            kind,
            entity,
            fingerprint,
        });

        Self {
            kind,
            entity,
            fingerprint,
            outcome: Outcome::Rows(0),
            finished: false,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        if let Outcome::Rows(_) = self.outcome {
            self.outcome = Outcome::Rows(rows);
        }
    }

    pub(crate) const fn set_error(&mut self, class: Option<ErrorClass>) {
        self.outcome = Outcome::Failed(class);
    }

    fn finish_inner(&self) {
        let event = match self.outcome {
            Outcome::Failed(class) => MetricsEvent::ExecError {
                kind: self.kind,
                entity: self.entity,
                fingerprint: self.fingerprint,
                class,
            },
            Outcome::Rows(rows) => MetricsEvent::ExecFinish {
                kind: self.kind,
                entity: self.entity,
                fingerprint: self.fingerprint,
                rows,
            },
        };

        record(event);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            self.finish_inner();
            self.finished = true;
        }
    }
}
