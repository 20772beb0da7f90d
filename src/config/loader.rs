//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::{GatewayConfig, LogFormat, RuntimeMode};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value, reason } => {
                write!(f, "Invalid value '{}' for {}: {}", value, key, reason)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests do not touch process state.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = parse_var("PORT", &port)?;
    }
    if let Some(host) = lookup("HOST") {
        config.listener.host = host;
    }
    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins;
    }
    if let Some(mode) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
        config.mode = RuntimeMode::from_env_value(&mode);
    }

    if let Some(enabled) = lookup("RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_var("RATE_LIMIT_ENABLED", &enabled)?;
    }
    if let Some(rps) = lookup("RATE_LIMIT_RPS") {
        config.rate_limit.requests_per_second = parse_var("RATE_LIMIT_RPS", &rps)?;
    }
    if let Some(burst) = lookup("RATE_LIMIT_BURST") {
        config.rate_limit.burst_size = parse_var("RATE_LIMIT_BURST", &burst)?;
    }
    if let Some(limit) = lookup("BODY_LIMIT_BYTES") {
        config.body.limit_bytes = parse_var("BODY_LIMIT_BYTES", &limit)?;
    }

    if let Some(url) = non_empty(lookup("SEARCH_SERVICE_URL")) {
        config.upstreams.search = Some(url);
    }
    if let Some(url) = non_empty(lookup("STREAM_SERVICE_URL")) {
        config.upstreams.stream = Some(url);
    }
    if let Some(url) = non_empty(lookup("TRACKS_SERVICE_URL")) {
        config.upstreams.tracks = Some(url);
    }

    if let Some(enabled) = lookup("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_var("METRICS_ENABLED", &enabled)?;
    }
    if let Some(address) = lookup("METRICS_ADDRESS") {
        config.observability.metrics_address = address;
    }
    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = parse_var::<LogFormat>("LOG_FORMAT", &format)?;
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("PORT", "8081"),
                ("ALLOWED_ORIGINS", "https://a.example,https://b.example"),
                ("NODE_ENV", "production"),
                ("RATE_LIMIT_BURST", "5"),
                ("TRACKS_SERVICE_URL", "http://tracks:9000"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.port, 8081);
        assert_eq!(config.cors.allowed_origins, "https://a.example,https://b.example");
        assert!(config.mode.is_production());
        assert_eq!(config.rate_limit.burst_size, 5);
        assert_eq!(config.upstreams.tracks.as_deref(), Some("http://tracks:9000"));
        assert!(config.upstreams.search.is_none());
    }

    #[test]
    fn test_app_env_beats_node_env() {
        let mut config = GatewayConfig::default();
        apply_env(&mut config, env(&[("APP_ENV", "test"), ("NODE_ENV", "production")])).unwrap();
        assert_eq!(config.mode, RuntimeMode::Test);
    }

    #[test]
    fn test_invalid_port() {
        let mut config = GatewayConfig::default();
        let err = apply_env(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn test_env_beats_file() {
        let mut config: GatewayConfig = toml::from_str("[listener]\nport = 4000\n").unwrap();
        apply_env(&mut config, env(&[("PORT", "5000")])).unwrap();
        assert_eq!(config.listener.port, 5000);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/gateway.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
