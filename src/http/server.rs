//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the middleware chain in its fixed order
//! - Bind server to listener
//! - Drain in-flight requests on shutdown
//!
//! # Middleware order (outermost first)
//! ```text
//! request id → outer panic catcher → trace → metrics → security headers
//!     → compression → error handler → panic catcher → origin guard → CORS headers
//!     → rate limit → body parsing → request log → router
//! ```

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::GatewayConfig;
use crate::health::{self, HealthState};
use crate::http::body::{parse_body, BodyLimits};
use crate::http::error::{handle_errors, not_found, panic_response, ErrorHandler};
use crate::http::request::{log_request, request_id, MakeRequestUuid};
use crate::lifecycle::{spawn_supervised, startup, Lifecycle, LifecycleState, ShutdownSignal, StartupError};
use crate::observability::metrics;
use crate::routing::{self, api_router, RouteGroups};
use crate::security::cors::{cors_layer, origin_guard};
use crate::security::headers::with_security_headers;
use crate::security::origin::OriginPolicy;
use crate::security::rate_limit::{rate_limit, RateLimiter};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
    lifecycle: Arc<Lifecycle>,
}

impl HttpServer {
    /// Create a server whose route groups forward to the configured upstreams.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let groups = RouteGroups::from_upstreams(&config.upstreams).map_err(StartupError::Routes)?;
        Ok(Self::with_routes(config, groups))
    }

    /// Create a server with caller-supplied route collaborators.
    pub fn with_routes(config: GatewayConfig, groups: RouteGroups) -> Self {
        let policy = Arc::new(OriginPolicy::from_config(&config.cors.allowed_origins));
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        tracing::info!(
            origins = ?policy.origins(),
            rate_limit_enabled = limiter.is_enabled(),
            body_limit_bytes = config.body.limit_bytes,
            mode = %config.mode,
            "Configuration loaded"
        );

        let router = Self::build_router(&config, groups, policy, limiter.clone());
        Self {
            router,
            config,
            limiter,
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        groups: RouteGroups,
        policy: Arc<OriginPolicy>,
        limiter: Arc<RateLimiter>,
    ) -> Router {
        let health_state = HealthState {
            service: config.service.name.as_str().into(),
            documentation_url: config.service.documentation_url.as_str().into(),
            started_at: Instant::now(),
        };
        let body_limits = BodyLimits {
            limit_bytes: config.body.limit_bytes,
        };
        let error_handler = ErrorHandler::new(config.mode);

        let router = Router::new()
            .route("/health", get(health::report).fallback(not_found))
            .route("/", get(routing::index).fallback(not_found))
            .with_state(health_state)
            .merge(api_router(groups))
            .fallback(not_found)
            // Layers below run innermost first.
            .layer(middleware::from_fn(log_request))
            .layer(middleware::from_fn_with_state(body_limits, parse_body))
            .layer(middleware::from_fn_with_state(limiter, rate_limit))
            .layer(cors_layer(policy.clone()))
            .layer(middleware::from_fn_with_state(policy, origin_guard))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(error_handler, handle_errors))
            .layer(CompressionLayer::new());

        with_security_headers(router)
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request),
                        )
                    })
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            // Panics in the layers outside the error stage.
            .layer(CatchPanicLayer::custom(move |payload: Box<dyn Any + Send + 'static>| {
                error_handler.render_panic(payload)
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.lifecycle.clone()
    }

    /// Run the server until `shutdown` fires and every in-flight request
    /// has completed.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let HttpServer {
            router,
            config,
            limiter,
            lifecycle,
        } = self;

        let local_addr = listener.local_addr()?;

        spawn_supervised("rate-limit-janitor", limiter.run_janitor(shutdown.clone()));

        if let Err(e) = lifecycle.transition(LifecycleState::Listening) {
            tracing::warn!(error = %e, "Unexpected lifecycle state");
        }
        startup::announce(local_addr, &config);

        let drain_lifecycle = lifecycle.clone();
        let mut drain = shutdown;
        let app = router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                drain.wait().await;
                tracing::info!("Shutting down gracefully, draining in-flight requests");
                let _ = drain_lifecycle.transition(LifecycleState::Draining);
            })
            .await?;

        let _ = lifecycle.transition(LifecycleState::Stopped);
        tracing::info!("Server closed");
        Ok(())
    }
}
