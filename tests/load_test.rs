//! Concurrent callers sharing one invoker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rpc_breaker::resilience::CircuitState;
use rpc_breaker::{RpcError, RpcInvoker};

mod common;

use common::test_config;

async fn run_concurrent(invoker: &RpcInvoker, service: &'static str, message: &'static str, tasks: usize) -> (u32, usize) {
    let calls = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::with_capacity(tasks);

    for _ in 0..tasks {
        let invoker = invoker.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            invoker
                .invoke(service, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Err(RpcError::from(message))
                })
                .await
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        let err = handle.await.expect("task panicked").unwrap_err();
        if err.is_breaker_open() {
            rejected += 1;
        }
    }
    (calls.load(Ordering::SeqCst), rejected)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_business_failures_keep_breaker_closed() {
    let invoker = RpcInvoker::new(&test_config());

    let (calls, rejected) = run_concurrent(&invoker, "leaseproduct-rpc", "库存不足", 100).await;

    assert_eq!(calls, 100);
    assert_eq!(rejected, 0);
    assert_eq!(invoker.breakers().state("leaseproduct-rpc"), CircuitState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_system_failures_open_breaker() {
    let invoker = RpcInvoker::new(&test_config());

    let (calls, rejected) = run_concurrent(&invoker, "loan-rpc", "connection reset by peer", 100).await;

    assert_eq!(calls as usize + rejected, 100, "every call either ran or was rejected");
    assert!(calls >= 3, "breaker needs min_requests samples before opening");
    assert_eq!(invoker.breakers().state("loan-rpc"), CircuitState::Open);

    // Once open, nothing reaches the service.
    let (calls, rejected) = run_concurrent(&invoker, "loan-rpc", "connection reset by peer", 20).await;
    assert_eq!(calls, 0);
    assert_eq!(rejected, 20);
}
