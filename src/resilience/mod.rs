//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Business logic call to a downstream service:
//!     → invoker.rs (pick the breaker for the service id)
//!     → circuit_breaker.rs (fail fast if open, otherwise admit)
//!     → the RPC itself
//!     → classify.rs (business or system failure?)
//!     → circuit_breaker.rs (system failures count, business ones don't)
//!     → friendly.rs (system failures become a per-service message)
//!     → On system failure: retries.rs (fixed delay, cancellable)
//! ```
//!
//! # Design Decisions
//! - A breaker per downstream service, never global
//! - Domain rejections never trip a breaker and are never retried
//! - Raw infrastructure errors are logged, not shown to callers
//! - Structured error kinds first; keyword matching only for untyped errors

pub mod circuit_breaker;
pub mod classify;
pub mod client;
pub mod friendly;
pub mod invoker;
pub mod retries;
pub mod types;

pub use circuit_breaker::{BreakerOpen, BreakerRegistry, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use classify::{Classifier, ErrorClass};
pub use client::ServiceClient;
pub use friendly::FriendlyMessages;
pub use invoker::RpcInvoker;
pub use retries::{CallContext, Interrupted, RetryPolicy};
pub use types::{BusinessKind, InvokeError, InvokeResult, RpcError, SystemKind};
