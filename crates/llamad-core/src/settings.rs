//! Supervisor settings and validation.
//!
//! These settings configure the supervisor itself (where the server binary
//! lives, how often to poll), not the server run. They are pure domain
//! types with no infrastructure dependencies.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Subsystem tag the server's output is recorded under.
pub const DEFAULT_SUBSYSTEM: &str = "llama-server";

/// Poll cadence shared by the log tailer and the status poller.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum number of entries kept in the tailer's buffer.
pub const DEFAULT_LOG_CAPACITY: usize = 5000;

/// Maximum number of entries retained by the in-memory sink.
pub const DEFAULT_SINK_CAPACITY: usize = 20_000;

/// Upper bound on a single status read.
pub const DEFAULT_STATUS_TIMEOUT_MS: u64 = 500;

/// Environment variable prefix read by [`SupervisorSettings::from_lookup`].
pub const ENV_PREFIX: &str = "LLAMAD_";

/// Supervisor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorSettings {
    /// Explicit llama-server binary. `None` searches `PATH`.
    pub server_binary: Option<PathBuf>,
    /// Subsystem tag for the server's log entries.
    pub subsystem: String,
    pub poll_interval_ms: u64,
    /// Tailer buffer cap; `None` keeps every entry.
    pub log_capacity: Option<usize>,
    pub sink_capacity: usize,
    pub status_timeout_ms: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SupervisorSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            server_binary: None,
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_capacity: Some(DEFAULT_LOG_CAPACITY),
            sink_capacity: DEFAULT_SINK_CAPACITY,
            status_timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
        }
    }

    /// Overlay values from a variable lookup (normally the process
    /// environment) onto the defaults.
    ///
    /// Recognized variables: `LLAMAD_SERVER_BINARY`, `LLAMAD_SUBSYSTEM`,
    /// `LLAMAD_POLL_INTERVAL_MS`, `LLAMAD_LOG_CAPACITY` (`0` = unbounded),
    /// `LLAMAD_SINK_CAPACITY`, `LLAMAD_STATUS_TIMEOUT_MS`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };
        let number = |name: &str| -> Result<Option<u64>, SettingsError> {
            var(name)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|_| SettingsError::InvalidNumber {
                        name: format!("{ENV_PREFIX}{name}"),
                        value: v.clone(),
                    })
                })
                .transpose()
        };

        let mut settings = Self::with_defaults();
        if let Some(path) = var("SERVER_BINARY") {
            settings.server_binary = Some(PathBuf::from(path));
        }
        if let Some(subsystem) = var("SUBSYSTEM") {
            settings.subsystem = subsystem.trim().to_string();
        }
        if let Some(ms) = number("POLL_INTERVAL_MS")? {
            settings.poll_interval_ms = ms;
        }
        if let Some(cap) = number("LOG_CAPACITY")? {
            settings.log_capacity = usize::try_from(cap).ok().filter(|c| *c > 0);
        }
        if let Some(cap) = number("SINK_CAPACITY")? {
            settings.sink_capacity = usize::try_from(cap).unwrap_or(usize::MAX);
        }
        if let Some(ms) = number("STATUS_TIMEOUT_MS")? {
            settings.status_timeout_ms = ms;
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Poll interval must be between 10 and 60000 ms, got {0}")]
    InvalidPollInterval(u64),

    #[error("Status timeout must be at least 1 ms")]
    InvalidStatusTimeout,

    #[error("Capacity must be at least 1")]
    InvalidCapacity,

    #[error("Subsystem tag cannot be empty")]
    EmptySubsystem,

    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: String, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &SupervisorSettings) -> Result<(), SettingsError> {
    if !(10..=60_000).contains(&settings.poll_interval_ms) {
        return Err(SettingsError::InvalidPollInterval(settings.poll_interval_ms));
    }

    if settings.status_timeout_ms == 0 {
        return Err(SettingsError::InvalidStatusTimeout);
    }

    if settings.sink_capacity == 0 || settings.log_capacity == Some(0) {
        return Err(SettingsError::InvalidCapacity);
    }

    if settings.subsystem.trim().is_empty() {
        return Err(SettingsError::EmptySubsystem);
    }

    Ok(())
}
