//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_connection_state` (gauge): 0=disconnected, 1=connecting, 2=connected
//! - `ledger_probe_failures_total` (counter): failed liveness probes by endpoint role
//! - `ledger_failovers_total` (counter): endpoint flips by target role
//! - `ledger_reconnects_total` (counter): reconnect attempts by outcome
//! - `ledger_events_total` (counter): routed notifications by event
//! - `ledger_submissions_total` (counter): submission outcomes

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::connection::ConnectionState;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_state(state: ConnectionState) {
    let value = match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
    };
    gauge!("ledger_connection_state").set(value);
}

pub fn record_probe_failure(role: &'static str) {
    counter!("ledger_probe_failures_total", "endpoint" => role).increment(1);
}

pub fn record_failover(target: &'static str) {
    counter!("ledger_failovers_total", "target" => target).increment(1);
}

pub fn record_reconnect(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("ledger_reconnects_total", "outcome" => outcome).increment(1);
}

pub fn record_event(event: &'static str) {
    counter!("ledger_events_total", "event" => event).increment(1);
}

pub fn record_submission(outcome: &'static str) {
    counter!("ledger_submissions_total", "outcome" => outcome).increment(1);
}
