use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
///
/// Ephemeral, in-memory counters for query execution.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Backend entrypoints
    pub fetch_calls: u64,
    pub count_calls: u64,

    // Rows returned
    pub rows_fetched: u64,
    pub rows_counted: u64,

    pub errors: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub fetch_calls: u64,
    pub count_calls: u64,
    pub rows_fetched: u64,
    pub rows_counted: u64,
    pub errors: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    /// Per-entity counters with averages, sorted by entity name.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub fetch_calls: u64,
    pub count_calls: u64,
    pub rows_fetched: u64,
    pub rows_counted: u64,
    pub errors: u64,
    pub avg_rows_per_fetch: f64,
}

/// Build a metrics report from the in-memory counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let entity_counters = snap
        .entities
        .iter()
        .map(|(entity, ops)| {
            let avg_rows_per_fetch = if ops.fetch_calls > 0 {
                ops.rows_fetched as f64 / ops.fetch_calls as f64
            } else {
                0.0
            };

            EntitySummary {
                entity: entity.clone(),
                fetch_calls: ops.fetch_calls,
                count_calls: ops.count_calls,
                rows_fetched: ops.rows_fetched,
                rows_counted: ops.rows_counted,
                errors: ops.errors,
                avg_rows_per_fetch,
            }
        })
        .collect();

    EventReport {
        counters: snap,
        entity_counters,
    }
}
