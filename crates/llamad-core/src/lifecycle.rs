//! Lifecycle state and errors for the supervised server process.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ports::ProcessError;

/// Externally observable lifecycle state.
///
/// In-flight transitions are never exposed: observers see the stable
/// endpoints only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Running,
}

impl LifecycleState {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Errors surfaced by lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` was requested while a server is already running.
    #[error("Server is already running")]
    AlreadyRunning,

    /// Another start/stop/restart is still in flight.
    #[error("Another lifecycle transition is in progress")]
    TransitionInProgress,

    /// The manager has been shut down and accepts no further transitions.
    #[error("Supervisor is shut down")]
    ShutDown,

    /// The server process could not be launched.
    #[error("Failed to launch server: {0}")]
    Launch(#[from] ProcessError),
}
