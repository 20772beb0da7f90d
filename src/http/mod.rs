//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → request.rs (request ID, context, request log)
//!     → body.rs (JSON / form parsing)
//!     → [routing decides collaborator]
//!     → error.rs (terminal error stage, 404 fallback)
//!     → Send to client
//! ```

pub mod body;
pub mod error;
pub mod request;
pub mod server;

pub use body::ParsedBody;
pub use error::{ApiError, ErrorEnvelope, ErrorHandler};
pub use request::{RequestContext, X_REQUEST_ID};
pub use server::HttpServer;
