//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate values the engine relies on (root path, header name, TLS paths)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("dispatch.root_path must start with '/', got {0:?}")]
    RootPath(String),

    #[error("dispatch.request_id_header is not a valid header name: {0:?}")]
    RequestIdHeader(String),

    #[error("listener.tls.{field} must not be empty")]
    TlsPath { field: &'static str },

    #[error("observability.log_level must not be empty")]
    LogLevel,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.dispatch.root_path.starts_with('/') {
        errors.push(ValidationError::RootPath(config.dispatch.root_path.clone()));
    }

    if HeaderName::from_bytes(config.dispatch.request_id_header.as_bytes()).is_err() {
        errors.push(ValidationError::RequestIdHeader(
            config.dispatch.request_id_header.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath { field: "cert_path" });
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath { field: "key_path" });
        }
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::LogLevel);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.dispatch.root_path = "index".to_string();
        config.dispatch.request_id_header = "bad header".to_string();
        config.listener.tls = Some(TlsConfig {
            cert_path: String::new(),
            key_path: "key.pem".to_string(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::RootPath("index".to_string()),
                ValidationError::RequestIdHeader("bad header".to_string()),
                ValidationError::TlsPath { field: "cert_path" },
            ]
        );
    }
}
