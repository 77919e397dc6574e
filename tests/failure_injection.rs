//! Failure injection tests for the RPC invoker.

use std::time::Duration;

use rpc_breaker::resilience::{BusinessKind, CircuitState, SystemKind};
use rpc_breaker::{CallContext, InvokeError, RpcError, RpcInvoker};

mod common;

use common::{count, counter, failing_call, programmable_call, test_config};

const LEASE_UNAVAILABLE: &str = "租赁服务暂时不可用，请稍后重试";
const LOAN_UNAVAILABLE: &str = "贷款服务暂时不可用，请稍后重试";

#[tokio::test(start_paused = true)]
async fn test_retry_until_success() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    let call = programmable_call(calls.clone(), |n| {
        if n < 3 {
            Err(RpcError::system(SystemKind::Timeout, "context deadline exceeded"))
        } else {
            Ok(format!("application-{}", n))
        }
    });

    let result = invoker
        .invoke_with_retry(&CallContext::new(), "lease-rpc", call, 3, Duration::from_millis(100))
        .await;

    assert_eq!(result.unwrap(), "application-3");
    assert_eq!(count(&calls), 3, "Should have attempted 3 times");
}

#[tokio::test(start_paused = true)]
async fn test_business_error_not_retried() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    let result = invoker
        .invoke_with_retry(
            &CallContext::new(),
            "appuser-rpc",
            failing_call(calls.clone(), "用户不存在"),
            5,
            Duration::from_millis(100),
        )
        .await;

    let err = result.unwrap_err();
    assert!(err.is_business());
    assert_eq!(err.to_string(), "用户不存在");
    assert_eq!(count(&calls), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_return_friendly_error() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    let result = invoker
        .invoke_with_retry(
            &CallContext::new(),
            "loan-rpc",
            failing_call(calls.clone(), "dial tcp 10.0.0.4:9000: connection refused"),
            2,
            Duration::from_millis(100),
        )
        .await;

    let err = result.unwrap_err();
    assert_eq!(count(&calls), 3);
    assert_eq!(err.to_string(), LOAN_UNAVAILABLE);
    let source = err.call_error().expect("raw error kept for logging");
    assert!(source.to_string().contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_retry_wait() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();
    let ctx = CallContext::new();

    let token = ctx.token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = invoker
        .invoke_with_retry(
            &ctx,
            "lease-rpc",
            failing_call(calls.clone(), "服务异常"),
            3,
            Duration::from_secs(10),
        )
        .await;

    assert!(matches!(result, Err(InvokeError::Cancelled)));
    assert_eq!(count(&calls), 1, "Retry delay should be aborted before the second attempt");
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_retry_wait() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();
    let ctx = CallContext::new().with_timeout(Duration::from_millis(150));

    let result = invoker
        .invoke_with_retry(&ctx, "lease-rpc", failing_call(calls.clone(), "timeout"), 5, Duration::from_millis(100))
        .await;

    assert!(matches!(result, Err(InvokeError::DeadlineExceeded)));
    assert_eq!(count(&calls), 2);
}

#[tokio::test]
async fn test_open_breaker_short_circuits() {
    let invoker = RpcInvoker::new(&test_config());
    invoker.breakers().force_open("lease-rpc");
    let calls = counter();

    let result = invoker.invoke("lease-rpc", failing_call(calls.clone(), "unused")).await;

    let err = result.unwrap_err();
    assert!(err.is_breaker_open());
    assert_eq!(err.to_string(), LEASE_UNAVAILABLE);
    assert_eq!(count(&calls), 0);
}

#[tokio::test]
async fn test_unknown_service_gets_generic_message() {
    let invoker = RpcInvoker::new(&test_config());
    invoker.breakers().force_open("billing-rpc");

    let result: Result<u64, _> = invoker
        .invoke_result("billing-rpc", || async { Ok(1) })
        .await;

    assert_eq!(result.unwrap_err().to_string(), "服务暂时不可用，请稍后重试");
}

#[tokio::test]
async fn test_business_failures_do_not_trip_breaker() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    for _ in 0..10 {
        let err = invoker
            .invoke("appuser-rpc", failing_call(calls.clone(), "密码错误"))
            .await
            .unwrap_err();
        assert!(err.is_business());
    }
    assert_eq!(invoker.breakers().state("appuser-rpc"), CircuitState::Closed);

    for _ in 0..3 {
        let err = invoker
            .invoke("appuser-rpc", failing_call(calls.clone(), "网络错误"))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
    // Window holds 10 healthy + 3 failed samples: ratio below threshold.
    assert_eq!(invoker.breakers().state("appuser-rpc"), CircuitState::Closed);
    assert_eq!(count(&calls), 13);
}

#[tokio::test]
async fn test_system_failures_trip_breaker() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    for _ in 0..3 {
        let _ = invoker.invoke("loan-rpc", failing_call(calls.clone(), "连接失败")).await;
    }
    assert_eq!(invoker.breakers().state("loan-rpc"), CircuitState::Open);

    let err = invoker
        .invoke("loan-rpc", failing_call(calls.clone(), "连接失败"))
        .await
        .unwrap_err();
    assert!(err.is_breaker_open());
    assert_eq!(count(&calls), 3);

    // Other services are unaffected.
    assert!(invoker.invoke("lease-rpc", || async { Ok(()) }).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_breaker_recovers_after_cooldown() {
    let invoker = RpcInvoker::new(&test_config());
    let calls = counter();

    for _ in 0..3 {
        let _ = invoker.invoke("loanproduct-rpc", failing_call(calls.clone(), "timeout")).await;
    }
    assert_eq!(invoker.breakers().state("loanproduct-rpc"), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(1_000)).await;

    let product = invoker
        .invoke_result("loanproduct-rpc", || async { Ok("LP-001") })
        .await
        .unwrap();
    assert_eq!(product, "LP-001");
    assert_eq!(invoker.breakers().state("loanproduct-rpc"), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_service_client_uses_configured_retry() {
    let invoker = RpcInvoker::new(&test_config());
    let lease = invoker.client("lease-rpc");
    let calls = counter();

    let err = lease
        .call_with_retry(&CallContext::new(), failing_call(calls.clone(), "unavailable"))
        .await
        .unwrap_err();

    assert_eq!(count(&calls), 3, "max_retries = 2 means three attempts");
    assert_eq!(err.to_string(), LEASE_UNAVAILABLE);
    assert_eq!(lease.service(), "lease-rpc");
    assert_eq!(lease.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_grpc_status_classification() {
    let invoker = RpcInvoker::new(&test_config());

    // Plain string errors from the service arrive as Unknown.
    let err = invoker
        .invoke_result::<(), _, _>("lease-rpc", || async {
            Err(RpcError::from(tonic::Status::unknown("申请不存在")))
        })
        .await
        .unwrap_err();
    assert!(err.is_business());
    assert_eq!(err.to_string(), "申请不存在");

    let err = invoker
        .invoke_result::<(), _, _>("lease-rpc", || async {
            Err(RpcError::from(tonic::Status::failed_precondition("application already approved")))
        })
        .await
        .unwrap_err();
    match err {
        InvokeError::Business(RpcError::Business { kind, .. }) => {
            assert_eq!(kind, BusinessKind::InvalidState)
        }
        other => panic!("expected business error, got {:?}", other),
    }
}
