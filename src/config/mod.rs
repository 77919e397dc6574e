//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → InvokerConfig (validated, immutable)
//!     → RpcInvoker::new builds breaker registry, classifier, message table
//! ```
//!
//! # Design Decisions
//! - Config is passed explicitly; there is no process-wide table
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BreakerConfig;
pub use schema::ClassifierConfig;
pub use schema::InvokerConfig;
pub use schema::MessagesConfig;
pub use schema::RetryConfig;
