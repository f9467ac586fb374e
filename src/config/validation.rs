//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. Every violation is collected, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Environments the server knows how to run in.
pub const ENVIRONMENTS: &[&str] = &["development", "staging", "production"];

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if !ENVIRONMENTS.contains(&config.server.environment.as_str()) {
        errors.push(ValidationError::new(
            "server.environment",
            format!("must be one of {}", ENVIRONMENTS.join("|")),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than zero"));
    }

    if config.database.path.trim().is_empty() {
        errors.push(ValidationError::new("database.path", "must be provided"));
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be greater than zero"));
    }
    if config.database.query_timeout_secs == 0 {
        errors.push(ValidationError::new("database.query_timeout_secs", "must be greater than zero"));
    }

    if config.limiter.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("limiter.sweep_interval_secs", "must be greater than zero"));
    }
    if config.limiter.idle_timeout_secs == 0 {
        errors.push(ValidationError::new("limiter.idle_timeout_secs", "must be greater than zero"));
    }

    if config.auth.token_ttl_hours == 0 {
        errors.push(ValidationError::new("auth.token_ttl_hours", "must be greater than zero"));
    }

    if config.workers.size == 0 {
        errors.push(ValidationError::new("workers.size", "must be greater than zero"));
    }
    if config.workers.queue_capacity == 0 {
        errors.push(ValidationError::new("workers.queue_capacity", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
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

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.server.environment = "qa".into();
        config.workers.size = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["server.bind_address", "server.environment", "workers.size"]);
    }

    #[test]
    fn test_non_positive_limiter_is_not_an_error() {
        let mut config = AppConfig::default();
        config.limiter.requests_per_second = -3.1;
        config.limiter.burst = 0;
        assert!(validate_config(&config).is_ok());
    }
}
