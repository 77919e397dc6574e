//! Per-service invoker handle.
//!
//! Services keep one of these per downstream dependency in their shared
//! context, e.g. `invoker.client("lease-rpc")`.

use std::future::Future;
use std::sync::Arc;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::invoker::RpcInvoker;
use crate::resilience::retries::CallContext;
use crate::resilience::types::{InvokeError, InvokeResult, RpcError};

#[derive(Debug, Clone)]
pub struct ServiceClient {
    invoker: RpcInvoker,
    service: Arc<str>,
}

impl ServiceClient {
    pub(crate) fn new(invoker: RpcInvoker, service: String) -> Self {
        Self {
            invoker,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn state(&self) -> CircuitState {
        self.invoker.breakers().state(&self.service)
    }

    pub async fn call<F, Fut>(&self, call: F) -> InvokeResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RpcError>>,
    {
        self.invoker.invoke(&self.service, call).await
    }

    pub async fn call_result<T, F, Fut>(&self, call: F) -> InvokeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        self.invoker.invoke_result(&self.service, call).await
    }

    pub async fn call_acceptable<T, F, Fut, A>(&self, call: F, acceptable: A) -> InvokeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
        A: FnOnce(&RpcError) -> bool,
    {
        self.invoker.invoke_acceptable(&self.service, call, acceptable).await
    }

    /// Call with the configured retry policy.
    pub async fn call_with_retry<T, F, Fut>(&self, ctx: &CallContext, call: F) -> InvokeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let policy = self.invoker.retry_policy();
        self.invoker
            .invoke_with_policy(ctx, &self.service, call, policy)
            .await
    }

    pub fn friendly_error(&self, err: RpcError) -> InvokeError {
        self.invoker.friendly_error(&self.service, err)
    }
}
