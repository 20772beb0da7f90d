//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener on the configured host and port
//! - Announce the effective address, runtime mode and base URLs
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::routing::API_BASE;

/// Error type for startup.
#[derive(Debug)]
pub enum StartupError {
    /// Failed to bind to address.
    Bind { address: String, source: std::io::Error },
    /// A route group could not be built.
    Routes(url::ParseError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Bind { address, source } => write!(f, "Failed to bind {}: {}", address, source),
            StartupError::Routes(e) => write!(f, "Invalid upstream URL: {}", e),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Bind { source, .. } => Some(source),
            StartupError::Routes(e) => Some(e),
        }
    }
}

/// Bind the configured address.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

/// Log where the gateway can be reached.
pub fn announce(local_addr: SocketAddr, config: &GatewayConfig) {
    let port = local_addr.port();
    tracing::info!(port, address = %local_addr, "Server started on port {}", port);
    tracing::info!(mode = %config.mode, "Environment: {}", config.mode);
    tracing::info!("Health: http://localhost:{}/health", port);
    tracing::info!("API Base: http://localhost:{}{}", port, API_BASE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut config = GatewayConfig::default();
        config.listener.host = "127.0.0.1".to_string();
        config.listener.port = 0;
        let listener = bind(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = GatewayConfig::default();
        config.listener.host = "127.0.0.1".to_string();
        config.listener.port = taken.local_addr().unwrap().port();

        let err = bind(&config).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
        assert!(err.to_string().contains("127.0.0.1"));
    }
}
