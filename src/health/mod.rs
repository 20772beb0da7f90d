//! Liveness reporting.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → report (handler)
//!     → snapshot.rs (uptime from monotonic clock, memory from the OS)
//!     → JSON HealthSnapshot
//! ```
//!
//! # Design Decisions
//! - Nothing is cached; every call measures again
//! - Uptime is measured from gateway construction with `Instant`

pub mod snapshot;

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};

pub use snapshot::{HealthSnapshot, MemoryUsage};

/// State shared by the health and index handlers.
#[derive(Debug, Clone)]
pub struct HealthState {
    pub service: Arc<str>,
    pub documentation_url: Arc<str>,
    pub started_at: Instant,
}

pub async fn report(State(state): State<HealthState>) -> Json<HealthSnapshot> {
    Json(HealthSnapshot::capture(&state.service, state.started_at))
}

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
