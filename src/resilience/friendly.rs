//! User-facing messages for unavailable services.

use std::collections::HashMap;

use crate::config::MessagesConfig;

/// Service id -> message table with a generic default.
#[derive(Debug, Clone)]
pub struct FriendlyMessages {
    default: String,
    services: HashMap<String, String>,
}

impl FriendlyMessages {
    pub fn new(config: &MessagesConfig) -> Self {
        Self {
            default: config.default.clone(),
            services: config.services.clone(),
        }
    }

    /// Message for a service, or the default for unknown ids.
    pub fn message_for(&self, service: &str) -> &str {
        self.services
            .get(service)
            .map(String::as_str)
            .unwrap_or(self.default.as_str())
    }

    pub fn default_message(&self) -> &str {
        &self.default
    }
}

impl Default for FriendlyMessages {
    fn default() -> Self {
        Self::new(&MessagesConfig::default())
    }
}
