//! Resilient RPC invocation.
//!
//! Wraps downstream calls in per-service circuit breakers, tells domain
//! rejections apart from infrastructure failures, and retries the latter
//! with a fixed, cancellable delay.
//!
//! ```ignore
//! let invoker = RpcInvoker::new(&load_config(path)?);
//! let lease = invoker.client("lease-rpc");
//!
//! let app = lease
//!     .call_with_retry(&ctx, || async {
//!         rpc.clone()
//!             .get_lease_application(req.clone())
//!             .await
//!             .map(|resp| resp.into_inner())
//!             .map_err(RpcError::from)
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::InvokerConfig;
pub use resilience::{CallContext, InvokeError, RpcError, RpcInvoker, ServiceClient};
