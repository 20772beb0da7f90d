//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Runtime mode (development, production, test).
    pub mode: RuntimeMode,

    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request body parsing limits.
    pub body: BodyConfig,

    /// Upstream services behind the versioned route groups.
    pub upstreams: UpstreamConfig,

    /// Service identity reported by `/` and `/health`.
    pub service: ServiceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Runtime mode of the process.
///
/// Only `Production` changes behaviour: 500 error messages are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
    Test,
}

impl RuntimeMode {
    pub fn is_production(self) -> bool {
        self == RuntimeMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
            RuntimeMode::Test => "test",
        }
    }

    /// Lenient parse used for environment values: anything unknown is
    /// development.
    pub fn from_env_value(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeMode::Development),
            "production" | "prod" => Ok(RuntimeMode::Production),
            "test" => Ok(RuntimeMode::Test),
            other => Err(format!("unknown runtime mode '{}'", other)),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (all interfaces by default).
    pub host: String,

    /// Listen port.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Comma-separated origin list, or `*` for every origin.
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Tokens refilled per second per client IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,

    /// Buckets untouched for this long are dropped.
    pub idle_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 20,
            burst_size: 100,
            idle_secs: 300,
        }
    }
}

/// Request body parsing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum size of a JSON or form body in bytes.
    pub limit_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            limit_bytes: 100 * 1024,
        }
    }
}

/// Upstream base URLs for the route groups. A group without URL answers 503.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub search: Option<String>,
    pub stream: Option<String>,
    pub tracks: Option<String>,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name reported by the health endpoint.
    pub name: String,

    /// Documentation link reported by the root endpoint.
    pub documentation_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "music-api".to_string(),
            documentation_url: "https://github.com/yourusername/music-api".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON in production, human readable otherwise.
    #[default]
    Auto,
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LogFormat::Auto),
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Auto,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.listener.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.cors.allowed_origins, "*");
        assert_eq!(config.body.limit_bytes, 102_400);
        assert_eq!(config.mode, RuntimeMode::Development);
        assert!(config.upstreams.search.is_none());
    }

    #[test]
    fn test_runtime_mode_parse() {
        assert_eq!("production".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert_eq!("PRODUCTION".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert_eq!("test".parse::<RuntimeMode>(), Ok(RuntimeMode::Test));
        assert!("staging".parse::<RuntimeMode>().is_err());
        assert_eq!(RuntimeMode::from_env_value("staging"), RuntimeMode::Development);
    }

    #[test]
    fn test_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            mode = "production"

            [listener]
            port = 8080

            [upstreams]
            search = "http://search.internal:7000"
            "#,
        )
        .unwrap();
        assert!(config.mode.is_production());
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.upstreams.search.as_deref(), Some("http://search.internal:7000"));
        assert!(config.rate_limit.enabled);
    }
}
