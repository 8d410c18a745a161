//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check client app table references
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),
    #[error("{field} must be a positive, finite number of seconds (got {value})")]
    Seconds { field: &'static str, value: f64 },
    #[error("internal prefix `{0}` must start with '/' and not end with '/'")]
    InternalPrefix(String),
    #[error("max_body_bytes must be greater than zero")]
    BodyLimit,
    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
    #[error("client app `{app}` has invalid base URL `{url}`")]
    AppUrl { app: String, url: String },
    #[error("default client app `{0}` is not listed under [clients.apps]")]
    UnknownDefaultApp(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    for (field, value) in [
        ("http.timeout_secs", config.http.timeout_secs),
        ("http.slow_api_threshold_secs", config.http.slow_api_threshold_secs),
    ] {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::Seconds { field, value });
        }
    }

    let prefix = &config.http.internal_prefix;
    if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
        errors.push(ValidationError::InternalPrefix(prefix.clone()));
    }

    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for (app, url) in &config.clients.apps {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::AppUrl {
                app: app.clone(),
                url: url.clone(),
            });
        }
    }

    if let Some(default_app) = &config.clients.default_app {
        if !config.clients.apps.contains_key(default_app) {
            errors.push(ValidationError::UnknownDefaultApp(default_app.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
