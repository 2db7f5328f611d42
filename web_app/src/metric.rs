use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("plakita_statds")
        .with_description("Plakita app statistics")
        .with_unit("attempt")
        .build()
});

fn incr_statds(metric: &'static str, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_user_action_statds(action: &str) {
    incr_statds("user_action", action.into())
}

/// lookup hits/misses, claims, deletes
pub fn incr_tag_action_statds(action: &str) {
    incr_statds("tag_action", action.into())
}

pub fn incr_integrity_statds(outcome: &str) {
    incr_statds("integrity", outcome.into())
}
