//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Check header names and values are sendable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CheckerConfig → Result<(), Vec<ValidationError>>
//! - Runs before settings are handed to the loader or prober

use std::fmt;
use std::net::SocketAddr;

use reqwest::header::{HeaderName, HeaderValue};

use crate::config::schema::CheckerConfig;

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check the settings for values that deserialize fine but cannot work.
pub fn validate_settings(config: &CheckerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::new("probe.timeout_secs", "must be greater than 0"));
    }
    if config.probe.concurrency == 0 {
        errors.push(ValidationError::new("probe.concurrency", "must be greater than 0"));
    }
    for (name, value) in &config.probe.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "probe.headers",
                format!("invalid header name `{}`", name),
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                "probe.headers",
                format!("invalid value for header `{}`", name),
            ));
        }
    }

    if config.loader.subnet_fetch_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "loader.subnet_fetch_timeout_secs",
            "must be greater than 0",
        ));
    }
    let extension = config.loader.descriptor_extension.trim_start_matches('.');
    if extension.is_empty() {
        errors.push(ValidationError::new(
            "loader.descriptor_extension",
            "must not be empty",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "`{}` is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
