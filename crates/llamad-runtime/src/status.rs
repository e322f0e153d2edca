//! Status poller.
//!
//! Samples whether the server is running on a fixed cadence and republishes
//! it on a `watch` channel. Receivers are only notified when the value
//! changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::poll::{PollCycle, spawn_poll_loop};
use crate::process::ProcessLifecycleManager;

/// Anything that can report whether the server is running.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn is_running(&self) -> bool;
}

#[async_trait]
impl StatusSource for ProcessLifecycleManager {
    async fn is_running(&self) -> bool {
        Self::is_running(self)
    }
}

/// Periodically republishes [`StatusSource::is_running`].
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    read_timeout: Duration,
    tx: watch::Sender<bool>,
}

impl StatusPoller {
    /// Reads slower than `read_timeout` count as not running.
    pub fn new(source: Arc<dyn StatusSource>, read_timeout: Duration) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            source,
            read_timeout,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Sample once, returning the published value.
    pub async fn poll_once(&self) -> bool {
        let running = if let Ok(running) = timeout(self.read_timeout, self.source.is_running()).await {
            running
        } else {
            warn!(timeout = ?self.read_timeout, "Status read timed out, reporting stopped");
            false
        };

        let changed = self.tx.send_if_modified(|current| {
            if *current == running {
                return false;
            }
            *current = running;
            true
        });
        if changed {
            debug!(running, "Server status changed");
        }
        running
    }

    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> JoinHandle<Self> {
        spawn_poll_loop("status-poller", self, period, cancel)
    }
}

#[async_trait]
impl PollCycle for StatusPoller {
    async fn cycle(&mut self) {
        self.poll_once().await;
    }
}
