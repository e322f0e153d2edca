//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - Express **intent**, not implementation detail
//! - No tokio/process types in any signature
//! - Every port must be fakeable in tests

pub mod log_sink;
pub mod model_access;
pub mod server_launcher;

use thiserror::Error;

pub use log_sink::{LogQuery, LogSinkPort, TailError};
pub use model_access::{AccessGrant, ModelAccessPort};
pub use server_launcher::{ServerLauncher, ServerProcess};

/// Errors reported by the external server process API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The server binary could not be located.
    #[error("Server binary not found: {0}")]
    BinaryNotFound(String),

    /// The model file could not be opened for the duration of the run.
    #[error("Model access denied: {0}")]
    AccessDenied(String),

    /// Failed to start the process.
    #[error("Failed to start: {0}")]
    StartFailed(String),

    /// Failed to stop the process.
    #[error("Failed to stop: {0}")]
    StopFailed(String),
}

/// Core error type for semantic domain errors.
///
/// Adapters map this to their own error types (CLI exit codes, UI alerts).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),
}
