//! Supervisor composition.
//!
//! Ties one lifecycle manager to a log tailer and a status poller that share
//! a cancellation token. Consumers hold the context and read everything
//! through it; nothing here is global.

use std::sync::Arc;

use llamad_core::lifecycle::LifecycleState;
use llamad_core::ports::LogSinkPort;
use llamad_core::settings::SupervisorSettings;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logs::{LogTailer, LogView};
use crate::process::ProcessLifecycleManager;
use crate::status::StatusPoller;

/// Running supervisor: manager plus both polling loops.
pub struct SupervisorContext {
    manager: Arc<ProcessLifecycleManager>,
    logs: LogView,
    status: watch::Receiver<bool>,
    cancel: CancellationToken,
    tailer_task: Option<JoinHandle<LogTailer>>,
    status_task: Option<JoinHandle<StatusPoller>>,
}

impl SupervisorContext {
    /// Start the log tailer and status poller for `manager`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        manager: Arc<ProcessLifecycleManager>,
        sink: Arc<dyn LogSinkPort>,
        settings: &SupervisorSettings,
    ) -> Self {
        let cancel = CancellationToken::new();
        let period = settings.poll_interval();

        let tailer = LogTailer::new(sink, settings.subsystem.clone(), settings.log_capacity);
        let logs = tailer.view();
        let tailer_task = tailer.spawn(period, cancel.child_token());

        let poller = StatusPoller::new(manager.clone(), settings.status_timeout());
        let status = poller.subscribe();
        let status_task = poller.spawn(period, cancel.child_token());

        debug!(subsystem = %settings.subsystem, ?period, "Supervisor loops started");
        Self {
            manager,
            logs,
            status,
            cancel,
            tailer_task: Some(tailer_task),
            status_task: Some(status_task),
        }
    }

    pub fn manager(&self) -> &Arc<ProcessLifecycleManager> {
        &self.manager
    }

    /// Observable log buffer.
    pub fn logs(&self) -> LogView {
        self.logs.clone()
    }

    /// Observable running flag, as sampled by the status poller.
    pub fn status(&self) -> watch::Receiver<bool> {
        self.status.clone()
    }

    /// Observable lifecycle state, published on each transition.
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.manager.state()
    }

    /// Stop both loops, wait for them, then stop the server.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.tailer_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Log tailer task failed");
            }
        }
        if let Some(task) = self.status_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Status poller task failed");
            }
        }
        self.manager.shutdown().await;
        debug!("Supervisor shut down");
    }
}

impl Drop for SupervisorContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
