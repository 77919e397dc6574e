//! Error classification.
//!
//! Structured errors are classified by their kind. Untyped errors and bare
//! messages fall back to keyword matching: case-insensitive substring match,
//! business keywords first, then system keywords, otherwise system.

use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::resilience::types::RpcError;

/// Whether a failure is a domain rejection or an infrastructure fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Business,
    System,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    business: Vec<String>,
    system: Vec<String>,
}

fn normalize(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            business: normalize(&config.business_keywords),
            system: normalize(&config.system_keywords),
        }
    }

    pub fn classify(&self, err: &RpcError) -> ErrorClass {
        match err {
            RpcError::Business { .. } => ErrorClass::Business,
            RpcError::System { .. } => ErrorClass::System,
            RpcError::Untyped(message) => self.classify_message(message),
        }
    }

    pub fn classify_message(&self, message: &str) -> ErrorClass {
        let message = message.to_lowercase();

        if self.business.iter().any(|k| message.contains(k.as_str())) {
            return ErrorClass::Business;
        }
        if self.system.iter().any(|k| message.contains(k.as_str())) {
            return ErrorClass::System;
        }
        ErrorClass::System
    }

    /// Breaker predicate: no error, or a business error, is acceptable.
    pub fn is_acceptable(&self, err: Option<&RpcError>) -> bool {
        err.map_or(true, |e| self.is_business(e))
    }

    pub fn is_business(&self, err: &RpcError) -> bool {
        self.classify(err) == ErrorClass::Business
    }

    pub fn is_system(&self, err: &RpcError) -> bool {
        self.classify(err) == ErrorClass::System
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
