//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency per service
//! - `gateway_upstream_attempts_total` (counter): upstream attempts by service, outcome
//! - `gateway_circuit_transitions_total` (counter): breaker transitions by service, target state
//! - `gateway_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `gateway_rate_limited_total` (counter): requests rejected by the rate limiter
//!
//! Without an installed recorder every call here is a no-op, so tests and
//! deployments with metrics disabled pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed inbound request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);

    histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream attempt; `outcome` is "success" or an error kind label.
pub fn record_upstream_attempt(service: &str, outcome: &'static str) {
    counter!(
        "gateway_upstream_attempts_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a circuit breaker state change.
pub fn record_breaker_transition(service: &str, to: CircuitState) {
    counter!(
        "gateway_circuit_transitions_total",
        "service" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);

    let value = match to {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("gateway_circuit_state", "service" => service.to_string()).set(value);
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited(key_kind: &'static str) {
    counter!("gateway_rate_limited_total", "key" => key_kind).increment(1);
}
