//! Gateway lifecycle state machine.
//!
//! # States
//! ```text
//! Starting → Listening → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - Transitions only move forward; a repeated or backward transition is
//!   rejected and leaves the state untouched
//! - State changes logged for observability
//! - Observers subscribe through a watch channel

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Starting,
    Listening,
    Draining,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Listening => "listening",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Owner of the current lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Starting);
        Self { tx }
    }

    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `to`, which must be later than the current state.
    pub fn transition(&self, to: LifecycleState) -> Result<(), InvalidTransition> {
        let mut result = Ok(());
        self.tx.send_if_modified(|state| {
            if to > *state {
                tracing::debug!(from = %state, to = %to, "Lifecycle transition");
                *state = to;
                true
            } else {
                result = Err(InvalidTransition { from: *state, to });
                false
            }
        });
        result
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
