//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are wired together:
//! - In-memory log sink (shared with the tracing layer installed by `main`)
//! - llama-server launcher and file-handle model access
//! - Lifecycle manager
//!
//! Handlers receive the composed [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use llamad_core::CoreError;
use llamad_core::settings::SupervisorSettings;
use llamad_runtime::{FileModelAccess, LlamaServerLauncher, MemoryLogSink, ProcessLifecycleManager};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: SupervisorSettings,
}

impl CliConfig {
    /// Read settings from `LLAMAD_*` environment variables.
    ///
    /// `server_binary` (from `--server-binary`) overrides the environment.
    pub fn from_env(server_binary: Option<PathBuf>) -> Result<Self, CliError> {
        Self::from_lookup(|name| std::env::var(name).ok(), server_binary)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        server_binary: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let mut settings =
            SupervisorSettings::from_lookup(lookup).map_err(|e| CliError::from(CoreError::from(e)))?;
        if server_binary.is_some() {
            settings.server_binary = server_binary;
        }
        Ok(Self { settings })
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub settings: SupervisorSettings,
    /// Process-wide log sink.
    pub sink: Arc<MemoryLogSink>,
    pub manager: Arc<ProcessLifecycleManager>,
}

/// Compose the runtime around an existing sink.
pub fn bootstrap(config: CliConfig, sink: Arc<MemoryLogSink>) -> Result<CliContext> {
    let settings = config.settings;
    let launcher = LlamaServerLauncher::new(
        settings.server_binary.clone(),
        sink.clone(),
        settings.subsystem.clone(),
    );
    let manager = Arc::new(ProcessLifecycleManager::new(
        Arc::new(launcher),
        Arc::new(FileModelAccess),
    ));

    tracing::debug!(
        server_binary = ?settings.server_binary,
        subsystem = %settings.subsystem,
        "CLI context composed"
    );
    Ok(CliContext {
        settings,
        sink,
        manager,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_flag_overrides_environment() {
        let config = assert_ok!(CliConfig::from_lookup(
            |name| (name == "LLAMAD_SERVER_BINARY").then(|| "/usr/bin/llama-server".to_string()),
            Some(PathBuf::from("/opt/llama-server")),
        ));
        assert_eq!(
            config.settings.server_binary,
            Some(PathBuf::from("/opt/llama-server"))
        );
    }

    #[test]
    fn test_invalid_environment_is_config_error() {
        let err = assert_err!(CliConfig::from_lookup(
            |name| (name == "LLAMAD_POLL_INTERVAL_MS").then(|| "1".to_string()),
            None,
        ));
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_bootstrap_starts_stopped() {
        let config = assert_ok!(CliConfig::from_lookup(|_| None, None));
        let ctx = assert_ok!(bootstrap(config, Arc::new(MemoryLogSink::new(10))));
        assert!(!ctx.manager.is_running());
        assert_eq!(ctx.settings.subsystem, "llama-server");
    }
}
