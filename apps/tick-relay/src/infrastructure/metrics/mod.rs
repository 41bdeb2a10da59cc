//! Prometheus Metrics Module
//!
//! Exposes relay metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: received, broadcast, and decode-error counts
//! - **Connections**: upstream feed state and downstream subscriber counts
//! - **Subscriptions**: active upstream subscription count
//!
//! # Integration
//!
//! Metrics are rendered at `/metrics` on the HTTP server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "tick_relay_ticks_received_total",
        "Total ticks received from the upstream feed"
    );
    describe_counter!(
        "tick_relay_messages_broadcast_total",
        "Total update messages queued for downstream subscribers"
    );
    describe_counter!(
        "tick_relay_decode_errors_total",
        "Total malformed frames received from the upstream feed"
    );
    describe_counter!(
        "tick_relay_reconnects_total",
        "Total upstream reconnection attempts"
    );
    describe_counter!(
        "tick_relay_subscribers_dropped_total",
        "Total subscribers removed after a failed send"
    );

    describe_gauge!(
        "tick_relay_feed_connected",
        "Whether the upstream feed connection is established (0 or 1)"
    );
    describe_gauge!(
        "tick_relay_subscribers",
        "Number of connected downstream subscribers"
    );
    describe_gauge!(
        "tick_relay_upstream_subscriptions",
        "Number of symbols subscribed on the upstream feed"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a tick received from the upstream feed.
pub fn record_tick_received() {
    counter!("tick_relay_ticks_received_total").increment(1);
}

/// Record update messages queued for downstream subscribers.
pub fn record_broadcast(delivered: u64) {
    counter!("tick_relay_messages_broadcast_total").increment(delivered);
}

/// Record a malformed upstream frame.
pub fn record_decode_error() {
    counter!("tick_relay_decode_errors_total").increment(1);
}

/// Record an upstream reconnection attempt.
pub fn record_reconnect() {
    counter!("tick_relay_reconnects_total").increment(1);
}

/// Record subscribers dropped after a failed send.
pub fn record_subscribers_dropped(count: u64) {
    counter!("tick_relay_subscribers_dropped_total").increment(count);
}

/// Update the upstream feed connection gauge.
pub fn set_feed_connected(connected: bool) {
    gauge!("tick_relay_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Update the downstream subscriber count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(count: usize) {
    gauge!("tick_relay_subscribers").set(count as f64);
}

/// Update the upstream subscription count.
#[allow(clippy::cast_precision_loss)]
pub fn set_upstream_subscriptions(count: usize) {
    gauge!("tick_relay_upstream_subscriptions").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        // Recording without an installed recorder is a silent no-op, so the
        // recording functions are safe to call from any state.
        record_tick_received();
        record_broadcast(3);
        set_feed_connected(true);
        set_subscribers(2);
    }
}
