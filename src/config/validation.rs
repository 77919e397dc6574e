//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges.
//! Every problem is reported, not just the first.

use thiserror::Error;

use crate::config::schema::InvokerConfig;

/// Upper bound on configured retries.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &InvokerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let breaker = &config.breaker;
    if breaker.window_secs == 0 {
        errors.push(ValidationError::new("breaker.window_secs", "must be greater than 0"));
    }
    if breaker.min_requests == 0 {
        errors.push(ValidationError::new("breaker.min_requests", "must be at least 1"));
    }
    if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio <= 1.0) {
        errors.push(ValidationError::new(
            "breaker.failure_ratio",
            format!("must be in (0, 1], got {}", breaker.failure_ratio),
        ));
    }
    if breaker.half_open_max_calls == 0 {
        errors.push(ValidationError::new("breaker.half_open_max_calls", "must be at least 1"));
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::new("breaker.success_threshold", "must be at least 1"));
    }

    if config.retry.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ValidationError::new(
            "retry.max_retries",
            format!("must be at most {}", MAX_RETRIES_LIMIT),
        ));
    }

    let classifier = &config.classifier;
    if classifier.business_keywords.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new("classifier.business_keywords", "contains an empty keyword"));
    }
    if classifier.system_keywords.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new("classifier.system_keywords", "contains an empty keyword"));
    }

    if config.messages.default.trim().is_empty() {
        errors.push(ValidationError::new("messages.default", "must not be empty"));
    }
    for (service, message) in &config.messages.services {
        if message.trim().is_empty() {
            errors.push(ValidationError::new(
                "messages.services",
                format!("empty message for '{}'", service),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
