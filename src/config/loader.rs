//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::InvokerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<InvokerConfig, ConfigError> {
    let config: InvokerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<InvokerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.breaker.min_requests, 5);
        assert_eq!(
            config.messages.services.get("lease-rpc").map(String::as_str),
            Some("租赁服务暂时不可用，请稍后重试")
        );
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = parse_config(
            r#"
            [breaker]
            failure_ratio = 0.25

            [retry]
            max_retries = 3
            retry_delay_ms = 50

            [messages]
            default = "try again later"

            [messages.services]
            "billing-rpc" = "billing is down"
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.failure_ratio, 0.25);
        assert_eq!(config.breaker.window_secs, 10);
        assert_eq!(config.retry.retry_delay_ms, 50);
        assert_eq!(config.messages.default, "try again later");
        assert_eq!(config.messages.services.len(), 1);
        assert!(!config.classifier.business_keywords.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[breaker]\nfailure_ratio = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("breaker.failure_ratio"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[retry\nmax_retries = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rpc-breaker.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
