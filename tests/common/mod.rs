//! Shared fakes for integration testing.

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rpc_breaker::config::{BreakerConfig, InvokerConfig, RetryConfig};
use rpc_breaker::RpcError;

/// Config with small thresholds so tests trip breakers quickly.
#[allow(dead_code)]
pub fn test_config() -> InvokerConfig {
    InvokerConfig {
        breaker: BreakerConfig {
            window_secs: 10,
            min_requests: 3,
            failure_ratio: 0.5,
            cooldown_ms: 1_000,
            half_open_max_calls: 1,
            success_threshold: 1,
        },
        retry: RetryConfig {
            max_retries: 2,
            retry_delay_ms: 100,
        },
        ..InvokerConfig::default()
    }
}

/// A programmable downstream call.
///
/// Counts invocations in `calls` and answers invocation `n` (starting at 1)
/// with `respond(n)`.
#[allow(dead_code)]
pub fn programmable_call<T, F>(
    calls: Arc<AtomicU32>,
    respond: F,
) -> impl FnMut() -> Ready<Result<T, RpcError>>
where
    F: Fn(u32) -> Result<T, RpcError>,
{
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        ready(respond(n))
    }
}

/// A call that always fails with the given message.
#[allow(dead_code)]
pub fn failing_call(
    calls: Arc<AtomicU32>,
    message: &'static str,
) -> impl FnMut() -> Ready<Result<(), RpcError>> {
    programmable_call(calls, move |_| Err(RpcError::from(message)))
}

#[allow(dead_code)]
pub fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

#[allow(dead_code)]
pub fn count(calls: &Arc<AtomicU32>) -> u32 {
    calls.load(Ordering::SeqCst)
}
