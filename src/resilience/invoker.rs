//! Breaker-guarded RPC invocation.
//!
//! Every call runs under the breaker of its service id. Business failures
//! pass through unchanged and count as healthy; system failures count
//! against the breaker and reach the caller as a friendly message.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::InvokerConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{BreakerOpen, BreakerRegistry};
use crate::resilience::classify::{Classifier, ErrorClass};
use crate::resilience::client::ServiceClient;
use crate::resilience::friendly::FriendlyMessages;
use crate::resilience::retries::{CallContext, Retrier, RetryPolicy};
use crate::resilience::types::{InvokeError, InvokeResult, RpcError};

/// Runs downstream calls under per-service circuit breakers.
///
/// Cheap to clone; clones share breaker state.
#[derive(Debug, Clone)]
pub struct RpcInvoker {
    breakers: BreakerRegistry,
    classifier: Arc<Classifier>,
    messages: Arc<FriendlyMessages>,
    retry: RetryPolicy,
}

impl RpcInvoker {
    pub fn new(config: &InvokerConfig) -> Self {
        Self {
            breakers: BreakerRegistry::new(config.breaker.clone()),
            classifier: Arc::new(Classifier::new(&config.classifier)),
            messages: Arc::new(FriendlyMessages::new(&config.messages)),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn messages(&self) -> &FriendlyMessages {
        &self.messages
    }

    /// Retry policy from configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// A handle bound to one downstream service.
    pub fn client(&self, service: impl Into<String>) -> ServiceClient {
        ServiceClient::new(self.clone(), service.into())
    }

    pub fn classify(&self, err: &RpcError) -> ErrorClass {
        self.classifier.classify(err)
    }

    pub fn is_business_error(&self, err: &RpcError) -> bool {
        self.classifier.is_business(err)
    }

    pub fn is_system_error(&self, err: &RpcError) -> bool {
        self.classifier.is_system(err)
    }

    /// Convert a downstream error into what the caller should see: business
    /// errors unchanged, system errors as the service's friendly message.
    pub fn friendly_error(&self, service: &str, err: RpcError) -> InvokeError {
        match self.classifier.classify(&err) {
            ErrorClass::Business => InvokeError::Business(err),
            ErrorClass::System => InvokeError::Unavailable {
                service: service.to_string(),
                message: self.messages.message_for(service).to_string(),
                source: Some(err),
            },
        }
    }

    /// Run a call with no result under the service's breaker.
    pub async fn invoke<F, Fut>(&self, service: &str, call: F) -> InvokeResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RpcError>>,
    {
        self.invoke_result(service, call).await
    }

    /// Run a call under the service's breaker and return its value.
    pub async fn invoke_result<T, F, Fut>(&self, service: &str, call: F) -> InvokeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let classifier = &self.classifier;
        self.invoke_acceptable(service, call, |err| classifier.is_business(err))
            .await
    }

    /// Like [`invoke_result`](Self::invoke_result), with a caller-chosen
    /// predicate deciding which errors leave the breaker untouched.
    pub async fn invoke_acceptable<T, F, Fut, A>(
        &self,
        service: &str,
        call: F,
        acceptable: A,
    ) -> InvokeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
        A: FnOnce(&RpcError) -> bool,
    {
        self.breakers
            .do_with_fallback_acceptable(
                service,
                move || async move {
                    match call().await {
                        Ok(value) => {
                            metrics::record_call(service, "success");
                            Ok(value)
                        }
                        Err(err) => Err(self.shape_error(service, err)),
                    }
                },
                |open| self.fallback(service, open),
                |err: Option<&InvokeError>| match err {
                    None => true,
                    Some(err) => err.call_error().map_or(false, acceptable),
                },
            )
            .await
    }

    /// Run a call, retrying system failures up to `max_retries` times with a
    /// fixed `retry_delay` between attempts.
    pub async fn invoke_with_retry<T, F, Fut>(
        &self,
        ctx: &CallContext,
        service: &str,
        call: F,
        max_retries: u32,
        retry_delay: Duration,
    ) -> InvokeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        self.invoke_with_policy(ctx, service, call, RetryPolicy::new(max_retries, retry_delay))
            .await
    }

    /// Run a call with retries driven by `policy`.
    ///
    /// Business errors end the loop at once. A cancelled or expired `ctx`
    /// during a wait ends it with [`InvokeError::Cancelled`] or
    /// [`InvokeError::DeadlineExceeded`].
    pub async fn invoke_with_policy<T, F, Fut>(
        &self,
        ctx: &CallContext,
        service: &str,
        mut call: F,
        policy: RetryPolicy,
    ) -> InvokeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut retrier = Retrier::new(ctx, service, policy);
        loop {
            let err = match self.invoke_result(service, &mut call).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.is_business() {
                return Err(err);
            }
            if !retrier.wait_for_retry(&err).await? {
                return Err(err);
            }
        }
    }

    fn shape_error(&self, service: &str, err: RpcError) -> InvokeError {
        let shaped = self.friendly_error(service, err);
        match &shaped {
            InvokeError::Business(err) => {
                metrics::record_call(service, "business");
                tracing::debug!(service, error = %err, "RPC call rejected by service");
            }
            InvokeError::Unavailable { source: Some(err), .. } => {
                metrics::record_call(service, "system");
                warn!(service, error = %err, "RPC call failed");
            }
            _ => {}
        }
        shaped
    }

    fn fallback(&self, service: &str, open: BreakerOpen) -> InvokeError {
        error!(service, error = %open, "RPC call failed, circuit breaker in effect");
        InvokeError::breaker_open(&open, self.messages.message_for(service))
    }
}

impl Default for RpcInvoker {
    fn default() -> Self {
        Self::new(&InvokerConfig::default())
    }
}
