//! Request identification, context and logging.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) unless the client sent one
//! - Resolve the client IP from the connection
//! - Build the per-request `RequestContext` and log it
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The context is built once and never mutated

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderName, Method, Request, Uri},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a UUID v4 for requests arriving without `X-Request-Id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Request ID of `request`, or `"unknown"` when none was assigned.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Client IP as seen on the connection, `"unknown"` without connection info.
pub fn client_ip<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Immutable snapshot of what the gateway knows about a request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub ip: String,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub query: Vec<(String, String)>,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let header_str = |name: HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let query: Vec<(String, String)> = request
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            ip: client_ip(request),
            origin: header_str(header::ORIGIN),
            user_agent: header_str(header::USER_AGENT),
            query,
        }
    }
}

/// Logs every request and attaches its `RequestContext`.
pub async fn log_request(mut request: Request<Body>, next: Next) -> Response {
    let context = RequestContext::from_request(&request);

    tracing::info!(
        ip = %context.ip,
        user_agent = context.user_agent.as_deref().unwrap_or("-"),
        query = ?context.query,
        "{} {}",
        context.method,
        context.uri
    );

    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_request() {
        let mut request = Request::builder()
            .uri("/api/v1/search?q=daft%20punk&limit=10")
            .header("Origin", "https://a.example")
            .header("User-Agent", "curl/8.0")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.0.2.7:51000".parse::<SocketAddr>().unwrap()));

        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.ip, "192.0.2.7");
        assert_eq!(ctx.origin.as_deref(), Some("https://a.example"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(
            ctx.query,
            vec![
                ("q".to_string(), "daft punk".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_connection_info() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
        assert_eq!(request_id(&request), "unknown");
        assert!(RequestContext::from_request(&request).query.is_empty());
    }

    #[test]
    fn test_make_request_uuid() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
