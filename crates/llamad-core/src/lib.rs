//! Core domain types and port definitions for llamad.
//!
//! This crate knows nothing about processes, threads or terminals. It holds
//! the validated server configuration, the lifecycle and log vocabulary, the
//! supervisor settings, and the ports implemented by `llamad-runtime`.
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod lifecycle;
pub mod logs;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError, DEFAULT_CTX_SIZE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, LogFormat, RawFields,
    RawValue, ServerConfig,
};
pub use lifecycle::{LifecycleError, LifecycleState};
pub use logs::{LogEntry, LogLevel};
pub use ports::{
    AccessGrant, CoreError, LogQuery, LogSinkPort, ModelAccessPort, ProcessError, ServerLauncher,
    ServerProcess, TailError,
};
pub use settings::{SettingsError, SupervisorSettings, validate_settings};
