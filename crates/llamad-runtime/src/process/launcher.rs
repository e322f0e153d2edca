//! llama-server launcher.
//!
//! Resolves the server binary, spawns it with the arguments derived from a
//! [`ServerConfig`], and wires its stdout/stderr into the log sink.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llamad_core::config::ServerConfig;
use llamad_core::logs::LogLevel;
use llamad_core::ports::{ProcessError, ServerLauncher, ServerProcess};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::shutdown::shutdown_child;
use super::stream::spawn_stream_reader;
use crate::logs::MemoryLogSink;

/// Binary name searched on `PATH` when no explicit path is configured.
pub const SERVER_BINARY_NAME: &str = "llama-server";

/// A child exiting within this window after spawn counts as a failed launch.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(250);

/// Errors locating the server binary.
#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("'{SERVER_BINARY_NAME}' was not found on PATH: {0}")]
    NotOnPath(#[from] which::Error),
}

impl From<BinaryError> for ProcessError {
    fn from(err: BinaryError) -> Self {
        Self::BinaryNotFound(err.to_string())
    }
}

/// Resolve the llama-server binary.
///
/// A configured path wins when it points at an executable file. Otherwise
/// (unset, empty, missing or not executable) `PATH` is searched for
/// [`SERVER_BINARY_NAME`].
pub fn resolve_server_binary(configured: Option<&Path>) -> Result<PathBuf, BinaryError> {
    resolve_in(configured, std::env::var_os("PATH"))
}

/// Resolution against an explicit search path in `PATH` syntax.
fn resolve_in(configured: Option<&Path>, search_path: Option<OsString>) -> Result<PathBuf, BinaryError> {
    if let Some(path) = configured {
        if path.as_os_str().is_empty() {
            warn!("Configured llama-server path is empty, searching PATH");
        } else if is_executable(path) {
            debug!(path = %path.display(), "Using configured llama-server");
            return Ok(path.to_path_buf());
        } else {
            warn!(
                path = %path.display(),
                "Configured llama-server is missing or not executable, searching PATH"
            );
        }
    }

    Ok(which::which_in(SERVER_BINARY_NAME, search_path, ".")?)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Launches llama-server as a child process.
#[derive(Debug, Clone)]
pub struct LlamaServerLauncher {
    binary: Option<PathBuf>,
    sink: Arc<MemoryLogSink>,
    subsystem: String,
    startup_grace: Duration,
}

impl LlamaServerLauncher {
    /// `binary` is resolved at every launch, so a server installed after
    /// startup is still found.
    pub fn new(binary: Option<PathBuf>, sink: Arc<MemoryLogSink>, subsystem: impl Into<String>) -> Self {
        Self {
            binary,
            sink,
            subsystem: subsystem.into(),
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    #[must_use]
    pub const fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }
}

#[async_trait]
impl ServerLauncher for LlamaServerLauncher {
    async fn launch(&self, config: &ServerConfig) -> Result<Box<dyn ServerProcess>, ProcessError> {
        let binary = resolve_server_binary(self.binary.as_deref())?;
        let args = config.to_args();
        info!(binary = %binary.display(), args = %args.join(" "), "Launching llama-server");

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::StartFailed(format!("{}: {e}", binary.display())))?;

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, self.sink.clone(), self.subsystem.clone(), LogLevel::Info);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, self.sink.clone(), self.subsystem.clone(), LogLevel::Notice);
        }

        // An immediate exit (bad flag, unreadable model) is a launch failure.
        if let Ok(status) = timeout(self.startup_grace, child.wait()).await {
            let detail = match status {
                Ok(status) => format!("llama-server exited during startup ({status})"),
                Err(e) => format!("failed to wait on llama-server: {e}"),
            };
            warn!("{detail}");
            return Err(ProcessError::StartFailed(detail));
        }

        let pid = child.id();
        info!(pid = ?pid, port = config.port, "llama-server started");
        Ok(Box::new(LlamaServerProcess { child, pid }))
    }
}

/// A running llama-server child.
#[derive(Debug)]
pub struct LlamaServerProcess {
    child: Child,
    pid: Option<u32>,
}

#[async_trait]
impl ServerProcess for LlamaServerProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self) -> Result<(), ProcessError> {
        let status = shutdown_child(&mut self.child)
            .await
            .map_err(|e| ProcessError::StopFailed(e.to_string()))?;
        debug!(pid = ?self.pid, %status, "llama-server exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A directory holding only an executable `llama-server`.
    #[cfg(unix)]
    fn search_dir_with_server() -> (TempDir, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let binary = dir.path().join(SERVER_BINARY_NAME);
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, binary)
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_configured_binary_falls_back_to_path() {
        let (dir, binary) = search_dir_with_server();
        let configured = Path::new("/nonexistent/llama-server");

        let found = resolve_in(Some(configured), Some(dir.path().into())).unwrap();
        assert_eq!(found, binary);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_configured_binary_is_skipped() {
        let (dir, binary) = search_dir_with_server();
        let file = tempfile::NamedTempFile::new().unwrap();

        let found = resolve_in(Some(file.path()), Some(dir.path().into())).unwrap();
        assert_eq!(found, binary);
    }

    #[test]
    fn test_unresolvable_binary_is_not_found() {
        let empty = TempDir::new().unwrap();
        let err = resolve_in(None, Some(empty.path().into())).unwrap_err();
        assert!(matches!(err, BinaryError::NotOnPath(_)));
        assert!(matches!(
            ProcessError::from(err),
            ProcessError::BinaryNotFound(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_configured_binary_wins() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, _) = search_dir_with_server();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolved = resolve_in(Some(file.path()), Some(dir.path().into())).unwrap();
        assert_eq!(resolved, file.path());
    }
}
