//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the output format for the runtime mode
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, human format for development
//! - Log level configurable via `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, RuntimeMode};

pub const DEFAULT_FILTER: &str = "music_gateway=info,tower_http=info";

/// Resolve `Auto` against the runtime mode.
pub fn effective_format(format: LogFormat, mode: RuntimeMode) -> LogFormat {
    match format {
        LogFormat::Auto if mode.is_production() => LogFormat::Json,
        LogFormat::Auto => LogFormat::Pretty,
        explicit => explicit,
    }
}

/// Install the global subscriber. Returns an error if one is already set.
pub fn init(format: LogFormat, mode: RuntimeMode) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match effective_format(format, mode) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
