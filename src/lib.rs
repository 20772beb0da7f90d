//! Music API gateway library.
//!
//! Exposes the building blocks the binary wires together so integration
//! tests can drive the exact same router without a socket.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RouteGroups;
