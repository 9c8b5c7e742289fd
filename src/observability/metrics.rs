//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guardrail_attempts_total` (counter): attempts started
//! - `guardrail_retries_total` (counter): backoff sleeps taken
//! - `guardrail_timeouts_total` (counter): attempts that hit the deadline
//! - `guardrail_budget_exhausted_total` (counter): retries denied by budget
//! - `guardrail_breaker_transitions_total` (counter): by breaker and state
//! - `guardrail_breaker_rejected_total` (counter): fail-fast rejections
//! - `guardrail_fallbacks_total` (counter): fallback invocations

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::breaker::state::BreakerState;

/// Install a Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt() {
    counter!("guardrail_attempts_total").increment(1);
}

pub fn record_retry() {
    counter!("guardrail_retries_total").increment(1);
}

pub fn record_timeout() {
    counter!("guardrail_timeouts_total").increment(1);
}

pub fn record_budget_exhausted() {
    counter!("guardrail_budget_exhausted_total").increment(1);
}

pub fn record_breaker_transition(breaker: &str, state: BreakerState) {
    counter!(
        "guardrail_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "state" => state.as_str()
    )
    .increment(1);
}

pub fn record_breaker_rejected(breaker: &str) {
    counter!(
        "guardrail_breaker_rejected_total",
        "breaker" => breaker.to_string()
    )
    .increment(1);
}

pub fn record_fallback() {
    counter!("guardrail_fallbacks_total").increment(1);
}
