//! Cross-origin enforcement.
//!
//! Two stages: `origin_guard` rejects disallowed origins with a classified
//! error, then `cors_layer` answers preflights and injects the CORS response
//! headers for allowed ones.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::security::origin::OriginPolicy;

/// Preflight cache lifetime (one day).
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

pub fn allowed_headers() -> [HeaderName; 6] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::RANGE,
        HeaderName::from_static("x-requested-with"),
        header::ACCEPT,
        header::ORIGIN,
    ]
}

pub fn exposed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
        HeaderName::from_static("x-request-id"),
    ]
}

/// CORS header injection for origins the policy allows.
///
/// The allowed origin is mirrored back: credentials rule out a literal `*`.
/// An empty origin is treated like a missing one and gets no CORS headers.
pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts| {
        mirrors_origin(&policy, origin)
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(allowed_headers())
        .expose_headers(exposed_headers())
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Whether `origin` gets mirrored into `Access-Control-Allow-Origin`.
fn mirrors_origin(policy: &OriginPolicy, origin: &HeaderValue) -> bool {
    match origin.to_str() {
        Ok("") | Err(_) => false,
        Ok(origin) => policy.decide(Some(origin)).is_allowed(),
    }
}

/// Rejects requests whose declared origin the policy denies.
pub async fn origin_guard(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let decision = match request.headers().get(header::ORIGIN) {
        None => policy.enforce(None),
        Some(value) => match value.to_str() {
            Ok(origin) => policy.enforce(Some(origin)),
            // Not representable as a string, so it cannot equal any entry.
            Err(_) if policy.origins().is_any() => policy.enforce(None),
            Err(_) => Err(ApiError::CorsDenied {
                origin: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            }),
        },
    };

    if let Err(ApiError::CorsDenied { origin }) = &decision {
        tracing::warn!(
            origin = %origin,
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request: origin not allowed"
        );
        metrics::record_cors_rejected();
    }

    decision?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrors_only_non_empty_allowed_origins() {
        let listed = OriginPolicy::from_config("https://a.example");
        assert!(mirrors_origin(&listed, &HeaderValue::from_static("https://a.example")));
        assert!(!mirrors_origin(&listed, &HeaderValue::from_static("https://c.example")));
        assert!(!mirrors_origin(&listed, &HeaderValue::from_static("")));

        let any = OriginPolicy::from_config("*");
        assert!(mirrors_origin(&any, &HeaderValue::from_static("https://c.example")));
        assert!(!mirrors_origin(&any, &HeaderValue::from_static("")));
    }
}
