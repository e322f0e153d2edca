//! Command handlers.
//!
//! Handlers are thin: turn CLI input into raw fields, call into the runtime,
//! format output for the terminal.

pub mod check;
pub mod serve;

use llamad_core::CoreError;
use llamad_core::config::ServerConfig;

use crate::commands::FieldArgs;
use crate::error::CliError;

/// Build a validated server config from the command's field sources.
pub(crate) fn build_config(fields: &FieldArgs) -> Result<ServerConfig, CliError> {
    let raw = fields.to_raw_fields()?;
    ServerConfig::build(&raw).map_err(|e| CliError::from(CoreError::from(e)))
}
