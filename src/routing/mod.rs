//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → /health            → health::report
//!     → /                  → index.rs
//!     → /api/v1/search/*   ┐
//!     → /api/v1/stream/*   ├ router.rs → collaborator (upstream.rs by default)
//!     → /api/v1/tracks/*   ┘
//!     → anything else      → http::error::not_found
//! ```

pub mod index;
pub mod router;
pub mod upstream;

pub use index::index;
pub use router::{api_router, RouteGroups, API_BASE};
