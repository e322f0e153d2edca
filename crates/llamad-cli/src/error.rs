//! CLI error type and exit-code mapping.

use llamad_core::CoreError;
use llamad_core::lifecycle::LifecycleError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid server options or arguments.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Supervisor settings are invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server could not be started or stopped.
    #[error("Process error: {0}")]
    Process(String),

    /// Another lifecycle request is still running.
    #[error("Busy: {0}")]
    Busy(String),
}

impl CliError {
    /// Map error to an exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Process(_) => 71,  // EX_OSERR
            Self::Busy(_) => 75,     // EX_TEMPFAIL
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(e) => Self::Arguments(e.to_string()),
            CoreError::Lifecycle(e @ LifecycleError::TransitionInProgress) => {
                Self::Busy(e.to_string())
            }
            CoreError::Lifecycle(e) => Self::Process(e.to_string()),
            CoreError::Settings(e) => Self::Config(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
