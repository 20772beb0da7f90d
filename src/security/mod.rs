//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → origin.rs + cors.rs (reject unlisted origins, answer preflight)
//!     → rate_limit.rs (per-IP token buckets)
//!     → Pass to body parsing and routing
//!
//! Outgoing response:
//!     → headers.rs (hardening headers on every response)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a denied origin never reaches a route handler
//! - Requests without an Origin header are allowed (curl, server-to-server)
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod origin;
pub mod rate_limit;

pub use origin::{AllowedOriginSet, OriginDecision, OriginPolicy};
pub use rate_limit::RateLimiter;
