//! Versioned route groups.
//!
//! # Responsibilities
//! - Mount the search, stream and tracks collaborators under `/api/v1`
//! - Build collaborators from upstream configuration
//!
//! # Design Decisions
//! - Prefixes are disjoint, so there is no precedence to resolve
//! - Immutable after construction (thread-safe without locks)
//! - A group without upstream answers 503 rather than 404

use axum::{
    body::Body,
    http::{Request, Uri},
    Router,
};
use tower::ServiceExt;

use crate::config::UpstreamConfig;
use crate::routing::upstream::{self, http_client, Upstream};

pub const API_BASE: &str = "/api/v1";
pub const SEARCH_PATH: &str = "/api/v1/search";
pub const STREAM_PATH: &str = "/api/v1/stream";
pub const TRACKS_PATH: &str = "/api/v1/tracks";

/// The three external route collaborators.
pub struct RouteGroups {
    pub search: Router,
    pub stream: Router,
    pub tracks: Router,
}

impl RouteGroups {
    /// Forward each group to its configured upstream.
    pub fn from_upstreams(config: &UpstreamConfig) -> Result<Self, url::ParseError> {
        let client = http_client();
        let group = |service: &'static str, url: &Option<String>| -> Result<Router, url::ParseError> {
            match url {
                Some(url) => {
                    tracing::info!(service, upstream = %url, "Route group forwards to upstream");
                    Ok(Upstream::new(service, url, client.clone())?.router())
                }
                None => {
                    tracing::warn!(service, "No upstream configured, route group unavailable");
                    Ok(upstream::unavailable(service))
                }
            }
        };

        Ok(Self {
            search: group("search", &config.search)?,
            stream: group("stream", &config.stream)?,
            tracks: group("tracks", &config.tracks)?,
        })
    }

    /// Every group answers `SERVICE_UNAVAILABLE`.
    pub fn unavailable() -> Self {
        Self {
            search: upstream::unavailable("search"),
            stream: upstream::unavailable("stream"),
            tracks: upstream::unavailable("tracks"),
        }
    }
}

pub fn api_router(groups: RouteGroups) -> Router {
    [
        (SEARCH_PATH, groups.search),
        (STREAM_PATH, groups.stream),
        (TRACKS_PATH, groups.tracks),
    ]
    .into_iter()
    .fold(Router::new(), |router, (prefix, group)| mount(router, prefix, group))
}

/// Nest `group` under `prefix`. `nest` leaves `{prefix}/` unmatched, so that
/// path is routed to the group's own `/`.
fn mount(router: Router, prefix: &str, group: Router) -> Router {
    let root = group.clone().map_request(to_group_root);
    router
        .route_service(&format!("{}/", prefix), root)
        .nest(prefix, group)
}

/// Rewrite the request target to `/`, keeping the query. `OriginalUri`
/// still carries the full path.
fn to_group_root(mut request: Request<Body>) -> Request<Body> {
    let target = match request.uri().query() {
        Some(query) => format!("/?{}", query),
        None => "/".to_string(),
    };
    if let Ok(uri) = target.parse::<Uri>() {
        *request.uri_mut() = uri;
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_root_keeps_query() {
        let request = Request::builder()
            .uri("/api/v1/search/?q=x&limit=5")
            .body(Body::empty())
            .unwrap();
        assert_eq!(to_group_root(request).uri(), "/?q=x&limit=5");

        let request = Request::builder().uri("/api/v1/tracks/").body(Body::empty()).unwrap();
        assert_eq!(to_group_root(request).uri(), "/");
    }
}
