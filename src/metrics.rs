//! Metrics for observability.
//!
//! Prometheus-style metrics via the `metrics` facade, prefixed `mirror_`.
//! Counters end in `_total`; gauges represent current state. The host
//! application installs whatever recorder it wants; without one these are
//! no-ops.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a fetched history page.
pub fn record_page_fetched(len: usize) {
    counter!("mirror_history_pages_total").increment(1);
    counter!("mirror_history_messages_total").increment(len as u64);
}

/// Record the assembled replay backlog at run start.
pub fn record_replay_backlog(len: usize) {
    gauge!("mirror_replay_backlog").set(len as f64);
}

/// Record a per-message outcome.
pub fn record_outcome(outcome: &str) {
    counter!("mirror_messages_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record bytes staged for one media object.
pub fn record_media_staged(bytes: u64) {
    counter!("mirror_media_staged_bytes_total").increment(bytes);
}

/// Record a retry of a transient operation.
pub fn record_retry(operation: &str) {
    counter!("mirror_retries_total", "operation" => operation.to_string()).increment(1);
}

/// Record a pin attempt.
pub fn record_pin(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("mirror_pins_total", "status" => status).increment(1);
}

/// Record how long one message took end to end.
pub fn record_message_duration(duration: Duration) {
    histogram!("mirror_message_duration_seconds").record(duration.as_secs_f64());
}
