//! Process-level lifecycle tests against a shell-script stand-in for
//! llama-server. The script echoes its arguments, so the log sink shows what
//! each run was launched with.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use llamad_core::config::{RawFields, ServerConfig};
use llamad_core::lifecycle::{LifecycleError, LifecycleState};
use llamad_core::ports::{LogQuery, LogSinkPort, ProcessError};
use llamad_runtime::{
    FileModelAccess, LlamaServerLauncher, MemoryLogSink, ProcessLifecycleManager,
};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const SUBSYSTEM: &str = "llama-server";

const LONG_RUNNING: &str = "#!/bin/sh\necho \"args: $*\"\nexec sleep 30\n";
const CRASHING: &str = "#!/bin/sh\necho \"error: invalid argument\" >&2\nexit 1\n";

struct Harness {
    dir: TempDir,
    sink: Arc<MemoryLogSink>,
    manager: ProcessLifecycleManager,
}

impl Harness {
    fn new(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let binary = dir.path().join("llama-server");
        std::fs::write(&binary, script).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("model.gguf"), b"GGUF").unwrap();

        let sink = Arc::new(MemoryLogSink::new(1000));
        let launcher = LlamaServerLauncher::new(Some(binary), sink.clone(), SUBSYSTEM);
        let manager = ProcessLifecycleManager::new(Arc::new(launcher), Arc::new(FileModelAccess));
        Self { dir, sink, manager }
    }

    fn model_path(&self) -> PathBuf {
        self.dir.path().join("model.gguf")
    }

    fn config(&self, port: u16) -> ServerConfig {
        config_for(&self.model_path(), port)
    }

    async fn messages(&self) -> Vec<String> {
        self.sink
            .entries(&LogQuery::new(SUBSYSTEM, None))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    /// Wait until some server output line contains `needle`.
    async fn wait_for_output(&self, needle: &str) -> bool {
        for _ in 0..100 {
            if self.messages().await.iter().any(|m| m.contains(needle)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

fn config_for(model: &Path, port: u16) -> ServerConfig {
    let fields = RawFields::new()
        .with("model", model.display().to_string())
        .with("port", port)
        .with("api-key", "alpha, beta");
    ServerConfig::build(&fields).unwrap()
}

#[tokio::test]
async fn test_restart_relaunches_with_new_port() {
    let h = Harness::new(LONG_RUNNING);

    assert_ok!(h.manager.start(h.config(8080)).await);
    assert!(h.manager.is_running());
    assert!(h.wait_for_output("--port 8080").await);
    assert!(h.wait_for_output("--api-key alpha,beta").await);
    let first_pid = h.manager.pid().await;

    assert_ok!(h.manager.restart(h.config(9090)).await);
    assert!(h.manager.is_running());
    assert!(h.wait_for_output("--port 9090").await);
    assert_ne!(h.manager.pid().await, first_pid);
    assert_eq!(h.manager.current_config().await.map(|c| c.port), Some(9090));

    assert_ok!(h.manager.stop().await);
    assert!(!h.manager.is_running());
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let h = Harness::new(LONG_RUNNING);
    assert_ok!(h.manager.start(h.config(8080)).await);

    let err = assert_err!(h.manager.start(h.config(9090)).await);
    assert!(matches!(err, LifecycleError::AlreadyRunning));
    assert_eq!(h.manager.current_config().await.map(|c| c.port), Some(8080));

    h.manager.shutdown().await;
}

#[tokio::test]
async fn test_crashing_server_is_a_launch_error() {
    let h = Harness::new(CRASHING);

    let err = assert_err!(h.manager.start(h.config(8080)).await);
    assert!(matches!(
        err,
        LifecycleError::Launch(ProcessError::StartFailed(_))
    ));
    assert!(!h.manager.is_running());
    assert_eq!(*h.manager.state().borrow(), LifecycleState::Stopped);
    assert!(h.wait_for_output("invalid argument").await);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = Harness::new(LONG_RUNNING);
    assert_ok!(h.manager.stop().await);

    assert_ok!(h.manager.start(h.config(8080)).await);
    assert_ok!(h.manager.stop().await);
    assert_ok!(h.manager.stop().await);
    assert!(!h.manager.is_running());
}

#[tokio::test]
async fn test_unreadable_model_is_rejected_before_launch() {
    let h = Harness::new(LONG_RUNNING);
    let config = h.config(8080);
    std::fs::remove_file(h.model_path()).unwrap();

    let err = assert_err!(h.manager.start(config).await);
    assert!(matches!(
        err,
        LifecycleError::Launch(ProcessError::AccessDenied(_))
    ));
    assert!(h.messages().await.is_empty());
}
