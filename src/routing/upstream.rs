//! Upstream forwarding for route groups.
//!
//! # Responsibilities
//! - Forward a group's requests to its upstream service
//! - Keep method, headers (minus hop-by-hop), body, path and query
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - One pooled client shared by all groups
//! - Connection failures become `UPSTREAM_ERROR`; upstream status codes
//!   (including 5xx) pass through untouched

use std::time::Instant;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, HeaderMap, HeaderValue, Request, Uri, Version},
    response::Response,
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::http::error::ApiError;
use crate::http::request::request_id;
use crate::observability::metrics;

pub type HttpClient = Client<HttpConnector, Body>;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// An upstream service behind one route group.
#[derive(Clone)]
pub struct Upstream {
    service: &'static str,
    base: Url,
    authority: String,
    client: HttpClient,
}

impl Upstream {
    pub fn new(service: &'static str, base_url: &str, client: HttpClient) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        let host = base.host_str().ok_or(url::ParseError::EmptyHost)?;
        let authority = match base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            service,
            base,
            authority,
            client,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Upstream URI for a request that arrived as `original`.
    pub fn target_uri(&self, original: &Uri) -> Result<Uri, ApiError> {
        let base_path = self.base.path().trim_end_matches('/');
        let path_and_query = original.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}://{}{}{}", self.base.scheme(), self.authority, base_path, path_and_query)
            .parse()
            .map_err(ApiError::internal)
    }

    /// Router forwarding every method and sub-path to this upstream.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", any(forward))
            .route("/{*rest}", any(forward))
            .with_state(self)
    }
}

async fn forward(
    State(upstream): State<Upstream>,
    OriginalUri(original): OriginalUri,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let (mut parts, body) = request.into_parts();

    parts.uri = upstream.target_uri(&original)?;
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);
    let host = HeaderValue::from_str(&upstream.authority).map_err(ApiError::internal)?;
    parts.headers.insert(header::HOST, host);

    tracing::debug!(
        request_id = %request_id,
        service = upstream.service,
        method = %parts.method,
        target = %parts.uri,
        "Forwarding request"
    );

    let method = parts.method.to_string();
    let result = upstream.client.request(Request::from_parts(parts, body)).await;

    match result {
        Ok(response) => {
            metrics::record_upstream(upstream.service, &method, response.status().as_u16(), start_time);
            Ok(relay(response))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, service = upstream.service, error = %e, "Upstream error");
            metrics::record_upstream(upstream.service, &method, 502, start_time);
            Err(ApiError::Upstream {
                service: upstream.service,
                source: Box::new(e),
            })
        }
    }
}

/// Hand an upstream response back to the client, minus hop-by-hop headers.
fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Router for a group without upstream: every request is `SERVICE_UNAVAILABLE`.
pub fn unavailable(service: &'static str) -> Router {
    let handler = move || async move { Err::<(), _>(ApiError::ServiceUnavailable { service }) };
    Router::new()
        .route("/", any(handler))
        .route("/{*rest}", any(handler))
}
