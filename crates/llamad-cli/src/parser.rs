//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Supervise a local llama-server process.
#[derive(Parser, Debug)]
#[command(name = "llamad")]
#[command(about = "Run and supervise a local llama-server")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// llama-server binary to run (default: search PATH)
    #[arg(long = "server-binary", global = true, env = "LLAMAD_SERVER_BINARY")]
    pub server_binary: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "llamad",
            "--verbose",
            "--server-binary",
            "/opt/llama/llama-server",
            "check",
            "--model",
            "m.gguf",
        ]);
        assert!(cli.verbose);
        assert_eq!(
            cli.server_binary,
            Some(PathBuf::from("/opt/llama/llama-server"))
        );
    }

    #[test]
    fn test_serve_collects_repeated_sets() {
        let cli = Cli::parse_from([
            "llamad",
            "serve",
            "--model",
            "m.gguf",
            "--set",
            "port=9000",
            "--set",
            "mlock=true",
        ]);
        let Commands::Serve { fields } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(fields.model, Some(PathBuf::from("m.gguf")));
        assert_eq!(fields.set, vec!["port=9000", "mlock=true"]);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["llamad"]).is_err());
    }
}
