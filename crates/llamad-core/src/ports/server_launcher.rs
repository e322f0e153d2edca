//! Server launcher port.
//!
//! The launcher is the external process API: it turns a [`ServerConfig`]
//! into a running process and hands back an owned [`ServerProcess`].
//! Whoever holds the process owns it exclusively; dropping it must not
//! leave the server running.

use async_trait::async_trait;

use super::ProcessError;
use crate::config::ServerConfig;

/// A running server process.
#[async_trait]
pub trait ServerProcess: Send + Sync {
    /// OS process id, when there is one.
    fn pid(&self) -> Option<u32>;

    /// Probe whether the process is still alive.
    ///
    /// Must not block. An exited process reports `false` from then on.
    fn is_alive(&mut self) -> bool;

    /// Terminate the process and wait for it to exit.
    async fn terminate(&mut self) -> Result<(), ProcessError>;
}

/// Launches server processes from a validated configuration.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    /// Start a server with the given configuration.
    async fn launch(&self, config: &ServerConfig) -> Result<Box<dyn ServerProcess>, ProcessError>;
}
