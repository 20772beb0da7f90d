//! Request body parsing.
//!
//! JSON and form-encoded bodies are buffered up to the configured limit,
//! parsed once and attached to the request as [`ParsedBody`]. The raw bytes
//! are put back so handlers and the upstream forwarder still see the body.
//! Other content types stream through untouched.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;

use crate::http::error::ApiError;

/// A parsed request body, available from request extensions.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub limit_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type: mime::Mime = headers
        .get(header::CONTENT_TYPE)?
        .to_str()
        .ok()?
        .parse()
        .ok()?;

    if content_type.type_() != mime::APPLICATION {
        return None;
    }
    if content_type.subtype() == mime::JSON || content_type.suffix() == Some(mime::JSON) {
        Some(BodyKind::Json)
    } else if content_type.subtype() == mime::WWW_FORM_URLENCODED {
        Some(BodyKind::Form)
    } else {
        None
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

pub async fn parse_body(
    State(limits): State<BodyLimits>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(kind) = body_kind(request.headers()) else {
        return Ok(next.run(request).await);
    };

    let limit = limits.limit_bytes;
    if declared_length(request.headers()).is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge { limit });
    }

    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.is::<LengthLimitError>() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::InvalidBody {
                message: format!("failed to read request body: {}", inner),
            }
        }
    })?;

    if !bytes.is_empty() {
        let parsed = match kind {
            BodyKind::Json => serde_json::from_slice(&bytes)
                .map(ParsedBody::Json)
                .map_err(|e| ApiError::InvalidBody {
                    message: format!("invalid JSON body: {}", e),
                })?,
            BodyKind::Form => {
                ParsedBody::Form(url::form_urlencoded::parse(&bytes).into_owned().collect())
            }
        };
        parts.extensions.insert(parsed);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(body_kind(&headers("application/json")), Some(BodyKind::Json));
        assert_eq!(body_kind(&headers("application/json; charset=utf-8")), Some(BodyKind::Json));
        assert_eq!(body_kind(&headers("application/vnd.api+json")), Some(BodyKind::Json));
        assert_eq!(
            body_kind(&headers("application/x-www-form-urlencoded")),
            Some(BodyKind::Form)
        );
        assert_eq!(body_kind(&headers("text/plain")), None);
        assert_eq!(body_kind(&headers("audio/mpeg")), None);
        assert_eq!(body_kind(&HeaderMap::new()), None);
    }

    #[test]
    fn test_declared_length() {
        let mut h = HeaderMap::new();
        assert_eq!(declared_length(&h), None);
        h.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(declared_length(&h), Some(42));
    }
}
