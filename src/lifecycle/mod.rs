//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build gateway → Bind listener → Listening
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Stopped → exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Failures (failures.rs):
//!     panic anywhere → logged by the hook
//!     background task failure → logged + counted, process keeps running
//!     server task failure → binary exits 1, no drain
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then listener
//! - Ordered shutdown: stop accept, drain, close
//! - No drain deadline: in-flight requests always complete

pub mod failures;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use failures::{await_server, install_panic_hook, spawn_supervised, ServerOutcome};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{termination_signal, TerminationSignal};
pub use startup::StartupError;
pub use state::{Lifecycle, LifecycleState};
