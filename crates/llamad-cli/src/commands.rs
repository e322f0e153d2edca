//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use llamad_core::config::RawFields;

use crate::error::CliError;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start llama-server and stream its output until Ctrl+C
    Serve {
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Validate a configuration and print the llama-server invocation
    Check {
        #[command(flatten)]
        fields: FieldArgs,

        /// Print the validated configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Server option sources, lowest precedence first: `--fields`, then each
/// `--set` in order, then `--model`.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Model file to serve
    #[arg(short = 'm', long)]
    pub model: Option<PathBuf>,

    /// Set a server option, e.g. `--set ctx-size=8192` (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// JSON object of server options
    #[arg(long = "fields", value_name = "FILE")]
    pub fields_file: Option<PathBuf>,
}

impl FieldArgs {
    /// Merge every source into one raw field set.
    pub fn to_raw_fields(&self) -> Result<RawFields, CliError> {
        let mut raw = match &self.fields_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
                RawFields::from_json(&json).map_err(|e| CliError::Arguments(e.to_string()))?
            }
            None => RawFields::new(),
        };

        for assignment in &self.set {
            raw.insert_assignment(assignment)
                .map_err(|e| CliError::Arguments(e.to_string()))?;
        }

        if let Some(model) = &self.model {
            raw.insert("model", model.display().to_string());
        }
        Ok(raw)
    }
}
