//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Invoker and breakers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges via the metrics facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host service installs
//! ```
//!
//! # Design Decisions
//! - Every log event carries the service id as a field
//! - Raw downstream errors are logged, never returned to callers

pub mod logging;
pub mod metrics;
