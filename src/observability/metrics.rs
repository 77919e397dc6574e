//! Metrics collection.
//!
//! # Metrics
//! - `rpc_breaker_calls_total` (counter): calls by service and outcome
//!   (`success`, `business`, `system`)
//! - `rpc_breaker_rejected_total` (counter): calls short-circuited by an open breaker
//! - `rpc_breaker_retries_total` (counter): retry attempts by service
//! - `rpc_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until the host installs a `metrics` recorder.

use crate::resilience::circuit_breaker::CircuitState;

pub fn record_call(service: &str, outcome: &'static str) {
    metrics::counter!(
        "rpc_breaker_calls_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rejected(service: &str) {
    metrics::counter!("rpc_breaker_rejected_total", "service" => service.to_string()).increment(1);
}

pub fn record_retry(service: &str) {
    metrics::counter!("rpc_breaker_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_breaker_state(service: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("rpc_breaker_state", "service" => service.to_string()).set(value);
}
