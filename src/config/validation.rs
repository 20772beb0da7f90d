//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Origin list entries must be bare origins
//! - Upstream URLs must be absolute http URLs
//! - Validate value ranges (limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;
use crate::security::origin::AllowedOriginSet;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let AllowedOriginSet::List(origins) = AllowedOriginSet::parse(&config.cors.allowed_origins) {
        if origins.is_empty() {
            errors.push(ValidationError::new("cors.allowed_origins", "no origin in list"));
        }
        for origin in &origins {
            if let Err(message) = check_origin(origin) {
                errors.push(ValidationError::new("cors.allowed_origins", message));
            }
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::new("rate_limit.requests_per_second", "must be greater than 0"));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::new("rate_limit.burst_size", "must be greater than 0"));
        }
    }

    if config.body.limit_bytes == 0 {
        errors.push(ValidationError::new("body.limit_bytes", "must be greater than 0"));
    }

    let upstreams = [
        ("upstreams.search", &config.upstreams.search),
        ("upstreams.stream", &config.upstreams.stream),
        ("upstreams.tracks", &config.upstreams.tracks),
    ];
    for (field, url) in upstreams {
        if let Some(url) = url {
            if let Err(message) = check_upstream(url) {
                errors.push(ValidationError::new(field, message));
            }
        }
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

/// An allow-list entry is compared verbatim with the browser's `Origin`
/// header, so anything beyond scheme://host[:port] can never match.
fn check_origin(origin: &str) -> Result<(), String> {
    if origin == "null" {
        return Ok(());
    }
    if origin == "*" {
        return Err("'*' cannot be combined with other origins".to_string());
    }
    let url = Url::parse(origin).map_err(|e| format!("'{}' is not an origin: {}", origin, e))?;
    if origin.ends_with('/') || url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{}' must not carry a path, query or fragment", origin));
    }
    Ok(())
}

fn check_upstream(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a URL: {}", raw, e))?;
    if url.scheme() != "http" {
        return Err(format!("'{}' must use the http scheme", raw));
    }
    if url.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }
    Ok(())
}
