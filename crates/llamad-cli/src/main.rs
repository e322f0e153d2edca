//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses arguments, installs logging (console plus the
//! in-memory sink) and dispatches to the handlers.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use llamad_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};
use llamad_runtime::{MemoryLogSink, SinkLayer};

fn init_logging(verbose: bool, sink: Arc<MemoryLogSink>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(SinkLayer::new(sink))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_env(cli.server_binary)?;
    let sink = Arc::new(MemoryLogSink::new(config.settings.sink_capacity));
    init_logging(cli.verbose, sink.clone());

    let ctx = bootstrap(config, sink)?;

    match cli.command {
        Commands::Serve { fields } => handlers::serve::execute(&ctx, &fields).await,
        Commands::Check { fields, json } => handlers::check::execute(&ctx, &fields, json),
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
