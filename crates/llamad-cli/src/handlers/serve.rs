//! Serve command handler.
//!
//! Starts llama-server, then prints tailed log entries and status changes
//! until Ctrl+C or until the server exits on its own.

use anyhow::Result;
use llamad_core::CoreError;
use llamad_core::logs::LogEntry;
use llamad_runtime::{LogBuffer, SupervisorContext};
use tokio::sync::watch;
use tracing::info;

use super::build_config;
use crate::bootstrap::CliContext;
use crate::commands::FieldArgs;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, fields: &FieldArgs) -> Result<()> {
    let config = build_config(fields)?;
    let port = config.port;
    let host = config.host.clone().unwrap_or_else(|| "127.0.0.1".to_string());

    let supervisor = SupervisorContext::spawn(ctx.manager.clone(), ctx.sink.clone(), &ctx.settings);
    let started = supervisor.manager().start(config).await;
    if let Err(e) = started {
        supervisor.shutdown().await;
        return Err(CliError::from(CoreError::from(e)).into());
    }
    println!("llama-server listening on http://{host}:{port} (Ctrl+C to stop)");

    let outcome = stream_until_exit(&supervisor).await;

    info!("Stopping llama-server");
    supervisor.shutdown().await;
    outcome
}

async fn stream_until_exit(supervisor: &SupervisorContext) -> Result<()> {
    let mut logs = supervisor.logs().subscribe();
    let mut status = supervisor.status();
    let mut lifecycle = supervisor.lifecycle();
    let mut printed = 0u64;

    // Started before the loop; a stop already published counts as a crash
    if !lifecycle.borrow_and_update().is_running() {
        return Err(crashed(&logs, printed));
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                return Ok(());
            }
            changed = logs.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                printed = print_new_entries(&logs, printed);
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let running = *status.borrow_and_update();
                println!("status: {}", if running { "running" } else { "stopped" });
            }
            changed = lifecycle.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                if !lifecycle.borrow_and_update().is_running() {
                    return Err(crashed(&logs, printed));
                }
            }
        }
    }
}

/// Flush what the server wrote before it died and build the exit error.
fn crashed(logs: &watch::Receiver<LogBuffer>, printed: u64) -> anyhow::Error {
    print_new_entries(logs, printed);
    CliError::Process("llama-server exited unexpectedly".into()).into()
}

/// Print entries accepted since `printed`, returning the new watermark.
fn print_new_entries(logs: &watch::Receiver<LogBuffer>, printed: u64) -> u64 {
    let buffer = logs.borrow();
    for entry in unseen(&buffer, printed) {
        println!("{entry}");
    }
    buffer.accepted()
}

fn unseen(buffer: &LogBuffer, printed: u64) -> impl Iterator<Item = &LogEntry> {
    let fresh = usize::try_from(buffer.accepted().saturating_sub(printed)).unwrap_or(usize::MAX);
    buffer.entries().skip(buffer.len().saturating_sub(fresh))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use std::time::Duration;

    use llamad_core::config::{RawFields, ServerConfig};
    use llamad_core::settings::SupervisorSettings;
    use llamad_runtime::{FileModelAccess, LlamaServerLauncher, MemoryLogSink, ProcessLifecycleManager};
    use tokio_test::{assert_err, assert_ok};

    /// Stays up past the startup grace, then dies well before a second poll.
    const SHORT_LIVED: &str = "#!/bin/sh\necho \"loading model\"\nsleep 0.5\nexit 1\n";

    #[tokio::test]
    async fn test_crash_between_polls_ends_serve() {
        let dir = assert_ok!(tempfile::TempDir::new());
        let binary = dir.path().join("llama-server");
        assert_ok!(std::fs::write(&binary, SHORT_LIVED));
        assert_ok!(std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)));
        let model = dir.path().join("model.gguf");
        assert_ok!(std::fs::write(&model, b"GGUF"));

        let settings = SupervisorSettings::with_defaults();
        let sink = Arc::new(MemoryLogSink::new(100));
        let launcher = LlamaServerLauncher::new(Some(binary), sink.clone(), settings.subsystem.clone());
        let manager = Arc::new(ProcessLifecycleManager::new(
            Arc::new(launcher),
            Arc::new(FileModelAccess),
        ));
        let supervisor = SupervisorContext::spawn(manager, sink, &settings);

        let fields = RawFields::new().with("model", model.display().to_string());
        let config = assert_ok!(ServerConfig::build(&fields));
        assert_ok!(supervisor.manager().start(config).await);

        let outcome = tokio::time::timeout(Duration::from_secs(4), stream_until_exit(&supervisor)).await;
        let err = assert_err!(assert_ok!(outcome));
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Process(_))));
        assert!(!supervisor.manager().is_running());

        supervisor.shutdown().await;
    }
}
