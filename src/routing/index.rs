//! Root endpoint describing the API.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::health::HealthState;
use crate::routing::router::API_BASE;

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub search: &'static str,
    pub track: &'static str,
    pub stream: &'static str,
    pub related: &'static str,
    pub trending: &'static str,
}

pub const ENDPOINTS: Endpoints = Endpoints {
    search: "/api/v1/search?q=query",
    track: "/api/v1/search/track/:id",
    stream: "/api/v1/stream/:id",
    related: "/api/v1/search/related/:id",
    trending: "/api/v1/tracks/trending",
};

#[derive(Debug, Serialize)]
pub struct ApiIndex {
    pub message: String,
    pub version: &'static str,
    pub documentation: String,
    pub endpoints: Endpoints,
    pub usage: String,
}

pub async fn index(State(state): State<HealthState>) -> Json<ApiIndex> {
    Json(ApiIndex {
        message: "🎵 Music API".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        documentation: state.documentation_url.to_string(),
        endpoints: ENDPOINTS,
        usage: format!("Add {}/ before any endpoint", API_BASE),
    })
}
