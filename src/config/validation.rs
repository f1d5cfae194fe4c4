//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProbeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),

    #[error("connectivity_check.path: {0:?} must start with '/' and not be the root")]
    InvalidRoutePath(String),

    #[error("connectivity_check.target_url: {0}")]
    InvalidTargetUrl(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProbeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    let check = &config.connectivity_check;
    if check.enabled {
        if !check.path.starts_with('/') || check.path == "/" {
            errors.push(ValidationError::InvalidRoutePath(check.path.clone()));
        }
        if let Err(e) = url::Url::parse(&check.target_url) {
            errors.push(ValidationError::InvalidTargetUrl(e.to_string()));
        }
        if check.timeout_secs == 0 {
            errors.push(ValidationError::Zero("connectivity_check.timeout_secs"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
