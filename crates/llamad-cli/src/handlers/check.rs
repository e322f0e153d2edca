//! Check command handler: validate and print the invocation, run nothing.

use anyhow::Result;
use llamad_core::config::ServerConfig;
use llamad_runtime::process::SERVER_BINARY_NAME;

use super::build_config;
use crate::bootstrap::CliContext;
use crate::commands::FieldArgs;

pub fn execute(ctx: &CliContext, fields: &FieldArgs, json: bool) -> Result<()> {
    let config = build_config(fields)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let binary = ctx
            .settings
            .server_binary
            .as_ref()
            .map_or_else(|| SERVER_BINARY_NAME.to_string(), |p| p.display().to_string());
        println!("{}", render_invocation(&binary, &config));
    }
    Ok(())
}

/// Shell-like rendering of the command line; arguments containing
/// whitespace are single-quoted.
fn render_invocation(binary: &str, config: &ServerConfig) -> String {
    std::iter::once(binary.to_string())
        .chain(config.to_args())
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
