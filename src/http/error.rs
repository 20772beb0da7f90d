//! Error taxonomy, error envelope and the terminal error stage.
//!
//! # Data Flow
//! ```text
//! middleware / handler returns Err(ApiError)
//!     → ApiError::into_response (provisional envelope + RaisedError extension)
//!     → handle_errors (terminal stage)
//!         logs full detail with method + URL
//!         re-renders envelope with masking for the runtime mode
//!     → client
//! ```
//!
//! # Design Decisions
//! - Only the terminal stage decides client-visible detail
//! - Status defaults to 500, code defaults to INTERNAL_ERROR
//! - 500 messages are masked in production; the code is never masked
//! - Unmatched routes are answered directly by `not_found`

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::RuntimeMode;

pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const MASKED_MESSAGE: &str = "Internal server error";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every request-scoped failure the gateway knows how to report.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The declared origin is not on the allow-list.
    #[error("Not allowed by CORS")]
    CorsDenied { origin: String },

    /// The client exhausted its rate limit bucket.
    #[error("Too many requests, please try again later.")]
    RateLimited { client: String },

    /// The request body exceeds the configured limit.
    #[error("request entity too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    /// The request body could not be parsed.
    #[error("{message}")]
    InvalidBody { message: String },

    /// The upstream service for a route group could not be reached.
    #[error("{service} service unreachable")]
    Upstream {
        service: &'static str,
        #[source]
        source: BoxError,
    },

    /// No upstream is configured for a route group.
    #[error("{service} service is not available")]
    ServiceUnavailable { service: &'static str },

    /// Error raised by a route collaborator.
    #[error("{message}")]
    Domain {
        message: String,
        status: Option<StatusCode>,
        code: Option<String>,
    },

    /// A handler panicked.
    #[error("{0}")]
    Panicked(String),

    /// Unclassified failure.
    #[error(transparent)]
    Internal(BoxError),
}

impl ApiError {
    /// A collaborator error with neither status nor code declared.
    pub fn domain(message: impl Into<String>) -> Self {
        ApiError::Domain {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    /// Declare a status on a domain error. No effect on other variants.
    pub fn with_status(mut self, new_status: StatusCode) -> Self {
        if let ApiError::Domain { status, .. } = &mut self {
            *status = Some(new_status);
        }
        self
    }

    /// Declare a code on a domain error. No effect on other variants.
    pub fn with_code(mut self, new_code: impl Into<String>) -> Self {
        if let ApiError::Domain { code, .. } = &mut self {
            *code = Some(new_code.into());
        }
        self
    }

    pub fn internal(err: impl Into<BoxError>) -> Self {
        ApiError::Internal(err.into())
    }

    /// Status declared by the error itself, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::CorsDenied { .. } => None,
            ApiError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::PayloadTooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            ApiError::InvalidBody { .. } => Some(StatusCode::BAD_REQUEST),
            ApiError::Upstream { .. } => Some(StatusCode::BAD_GATEWAY),
            ApiError::ServiceUnavailable { .. } => Some(StatusCode::SERVICE_UNAVAILABLE),
            ApiError::Domain { status, .. } => *status,
            ApiError::Panicked(_) | ApiError::Internal(_) => None,
        }
    }

    /// Machine-readable code declared by the error itself, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::CorsDenied { .. } => Some("CORS_ERROR"),
            ApiError::RateLimited { .. } => Some("RATE_LIMIT_EXCEEDED"),
            ApiError::PayloadTooLarge { .. } => Some("PAYLOAD_TOO_LARGE"),
            ApiError::InvalidBody { .. } => Some("INVALID_BODY"),
            ApiError::Upstream { .. } => Some("UPSTREAM_ERROR"),
            ApiError::ServiceUnavailable { .. } => Some("SERVICE_UNAVAILABLE"),
            ApiError::Domain { code, .. } => code.as_deref(),
            ApiError::Panicked(_) | ApiError::Internal(_) => None,
        }
    }

    pub fn response_status(&self) -> StatusCode {
        self.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn response_code(&self) -> &str {
        self.code().unwrap_or(INTERNAL_ERROR)
    }
}

/// Marker carrying a raised error from the stage that produced it to
/// [`handle_errors`].
#[derive(Clone)]
pub struct RaisedError(pub Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Provisional rendering; handle_errors replaces it when installed.
        let error = Arc::new(self);
        let mut response = (
            error.response_status(),
            Json(ErrorEnvelope::failure(error.to_string(), error.response_code())),
        )
            .into_response();
        response.extensions_mut().insert(RaisedError(error));
        response
    }
}

/// Uniform JSON body of every error response.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
}

impl ErrorEnvelope {
    pub fn failure(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            timestamp: None,
            path: None,
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::failure("Endpoint not found", NOT_FOUND)
        }
    }

    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = Some(crate::health::iso_timestamp());
        self
    }
}

/// Terminal error stage. Decides what the client sees for a raised error.
#[derive(Debug, Clone, Copy)]
pub struct ErrorHandler {
    mode: RuntimeMode,
}

impl ErrorHandler {
    pub fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Build the client-facing envelope for `error`.
    pub fn envelope(&self, error: &ApiError) -> (StatusCode, ErrorEnvelope) {
        let status = error.response_status();
        let message = if self.mode.is_production() && status == StatusCode::INTERNAL_SERVER_ERROR {
            MASKED_MESSAGE.to_string()
        } else {
            error.to_string()
        };
        (status, ErrorEnvelope::failure(message, error.response_code()).with_timestamp())
    }

    pub fn render(&self, error: &ApiError) -> Response {
        let (status, envelope) = self.envelope(error);
        (status, Json(envelope)).into_response()
    }

    /// Final rendering for a panic raised outside the error stage, where no
    /// later stage will see it.
    pub fn render_panic(&self, payload: Box<dyn Any + Send + 'static>) -> Response {
        let error = ApiError::Panicked(panic_message(payload.as_ref()));
        tracing::error!(message = %error, "Panic in outer middleware");
        self.render(&error)
    }
}

/// Middleware consuming errors raised anywhere below it.
pub async fn handle_errors(
    State(handler): State<ErrorHandler>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;
    let Some(RaisedError(error)) = response.extensions_mut().remove::<RaisedError>() else {
        return response;
    };

    tracing::error!(
        method = %method,
        url = %uri,
        status = error.response_status().as_u16(),
        code = error.response_code(),
        message = %error,
        detail = ?error,
        "API error"
    );

    let mut rendered = handler.render(&error);
    // Keep headers set by stages between the error and this one.
    for (name, value) in response.headers() {
        if !rendered.headers().contains_key(name) {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Fallback for unmatched routes.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<ErrorEnvelope>) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    tracing::debug!(path = %path, "No route matched");
    (StatusCode::NOT_FOUND, Json(ErrorEnvelope::not_found(path)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    }
}

/// Converts a caught handler panic into a raised error.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Panicked(panic_message(payload.as_ref())).into_response()
}
