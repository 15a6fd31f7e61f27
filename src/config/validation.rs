//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks value ranges and
//! formats. Validation is a pure function that returns every error found,
//! not just the first.

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be non-zero")]
    ZeroPort,

    #[error("runtime.required_version must not be empty")]
    EmptyRequiredVersion,

    #[error("cors.allowed_origins must not be empty")]
    NoOrigins,

    #[error("cors.allowed_methods must not be empty")]
    NoMethods,

    #[error("cors.allowed_methods contains invalid method '{0}'")]
    InvalidMethod(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimitField(&'static str),

    #[error("security.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("upstream.joke_url '{url}' is invalid: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.runtime.required_version.trim().is_empty() {
        errors.push(ValidationError::EmptyRequiredVersion);
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::NoOrigins);
    }
    if config.cors.allowed_methods.is_empty() {
        errors.push(ValidationError::NoMethods);
    }
    for method in &config.cors.allowed_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod(method.clone()));
        }
    }

    if config.security.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let rl = &config.rate_limit;
    if rl.window_secs == 0 {
        errors.push(ValidationError::ZeroRateLimitField("window_secs"));
    }
    if rl.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimitField("max_requests"));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroRateLimitField("sweep_interval_secs"));
    }

    match url::Url::parse(&config.upstream.joke_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        Ok(u) => errors.push(ValidationError::InvalidUpstreamUrl {
            url: config.upstream.joke_url.clone(),
            reason: format!("unsupported scheme '{}'", u.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUpstreamUrl {
            url: config.upstream.joke_url.clone(),
            reason: e.to_string(),
        }),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
