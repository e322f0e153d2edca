//! Lifecycle manager for the single supervised llama-server.
//!
//! States are `Stopped` and `Running`. Only one transition runs at a time;
//! a request arriving while another is in flight is rejected with
//! [`LifecycleError::TransitionInProgress`]. After [`ProcessLifecycleManager::shutdown`]
//! every start or restart fails with [`LifecycleError::ShutDown`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use llamad_core::config::ServerConfig;
use llamad_core::lifecycle::{LifecycleError, LifecycleState};
use llamad_core::ports::{AccessGrant, ModelAccessPort, ServerLauncher, ServerProcess};
use tokio::sync::{Mutex, Notify, watch};
use tracing::{info, warn};

/// RAII marker for the in-flight transition. Cleared on every exit path.
struct TransitionGuard<'a> {
    flag: &'a AtomicBool,
    released: &'a Notify,
}

impl<'a> TransitionGuard<'a> {
    fn acquire(flag: &'a AtomicBool, released: &'a Notify) -> Result<Self, LifecycleError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| LifecycleError::TransitionInProgress)?;
        Ok(Self { flag, released })
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }
}

/// Everything owned for the duration of one run.
struct RunningServer {
    process: Box<dyn ServerProcess>,
    config: ServerConfig,
    // Released after the process is gone
    _grant: Box<dyn AccessGrant>,
}

/// Owns the server process and enforces the start/stop/restart state machine.
pub struct ProcessLifecycleManager {
    launcher: Arc<dyn ServerLauncher>,
    access: Arc<dyn ModelAccessPort>,
    running: Mutex<Option<RunningServer>>,
    transitioning: AtomicBool,
    transition_released: Notify,
    closed: AtomicBool,
    state_tx: watch::Sender<LifecycleState>,
}

impl ProcessLifecycleManager {
    pub fn new(launcher: Arc<dyn ServerLauncher>, access: Arc<dyn ModelAccessPort>) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Stopped);
        Self {
            launcher,
            access,
            running: Mutex::new(None),
            transitioning: AtomicBool::new(false),
            transition_released: Notify::new(),
            closed: AtomicBool::new(false),
            state_tx,
        }
    }

    /// Start a server. Valid only while stopped.
    ///
    /// On failure the state stays `Stopped` and the attempted config is
    /// discarded.
    pub async fn start(&self, config: ServerConfig) -> Result<(), LifecycleError> {
        let _guard = self.begin_transition()?;
        self.ensure_open()?;
        let mut slot = self.running.lock().await;
        self.reap_if_dead(&mut slot);

        if slot.is_some() {
            return Err(LifecycleError::AlreadyRunning);
        }
        self.launch_into(&mut slot, config).await
    }

    /// Stop the server. Stopping a stopped manager succeeds and does nothing.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let _guard = self.begin_transition()?;
        let mut slot = self.running.lock().await;
        self.stop_locked(&mut slot).await;
        Ok(())
    }

    /// Stop, then start with `config`, as one transition.
    ///
    /// If the new server fails to launch the manager ends `Stopped`; the old
    /// server is never left running. From `Stopped` this is a plain start.
    pub async fn restart(&self, config: ServerConfig) -> Result<(), LifecycleError> {
        let _guard = self.begin_transition()?;
        self.ensure_open()?;
        let mut slot = self.running.lock().await;
        self.stop_locked(&mut slot).await;
        self.launch_into(&mut slot, config).await
    }

    /// Whether the server process is alive right now.
    ///
    /// Probes the process, so an out-of-band exit is observed here and the
    /// manager moves to `Stopped`. While a transition is in flight the last
    /// published state is returned instead of waiting.
    pub fn is_running(&self) -> bool {
        match self.running.try_lock() {
            Ok(mut slot) => {
                self.reap_if_dead(&mut slot);
                slot.is_some()
            }
            Err(_) => self.state_tx.borrow().is_running(),
        }
    }

    /// Receiver for stable lifecycle states.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Config of the running server, if any.
    pub async fn current_config(&self) -> Option<ServerConfig> {
        let mut slot = self.running.lock().await;
        self.reap_if_dead(&mut slot);
        slot.as_ref().map(|server| server.config.clone())
    }

    /// Process id of the running server, if any.
    pub async fn pid(&self) -> Option<u32> {
        let slot = self.running.lock().await;
        slot.as_ref().and_then(|server| server.process.pid())
    }

    /// Stop the server on teardown, waiting out any in-flight transition.
    ///
    /// The manager is closed first, so nothing queued behind the in-flight
    /// transition can launch a new server. Requests arriving while the stop
    /// runs are rejected as `TransitionInProgress`.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _guard = self.wait_for_transition().await;
        let mut slot = self.running.lock().await;
        self.stop_locked(&mut slot).await;
    }

    fn begin_transition(&self) -> Result<TransitionGuard<'_>, LifecycleError> {
        TransitionGuard::acquire(&self.transitioning, &self.transition_released)
    }

    async fn wait_for_transition(&self) -> TransitionGuard<'_> {
        loop {
            let released = self.transition_released.notified();
            tokio::pin!(released);
            // Register before trying so a release in between is not missed
            released.as_mut().enable();

            if let Ok(guard) = self.begin_transition() {
                return guard;
            }
            released.await;
        }
    }

    fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LifecycleError::ShutDown);
        }
        Ok(())
    }

    async fn launch_into(
        &self,
        slot: &mut Option<RunningServer>,
        config: ServerConfig,
    ) -> Result<(), LifecycleError> {
        let grant = self.access.acquire(&config.model_path)?;
        let process = self.launcher.launch(&config).await?;

        info!(
            pid = ?process.pid(),
            model = %config.model_path.display(),
            port = config.port,
            "Server running"
        );
        *slot = Some(RunningServer {
            process,
            config,
            _grant: grant,
        });
        self.publish(LifecycleState::Running);
        Ok(())
    }

    async fn stop_locked(&self, slot: &mut Option<RunningServer>) {
        let Some(mut server) = slot.take() else {
            return;
        };

        let pid = server.process.pid();
        if let Err(e) = server.process.terminate().await {
            // Dropping the handle kills the child
            warn!(?pid, error = %e, "Server did not stop cleanly");
        }
        drop(server);

        info!(?pid, "Server stopped");
        self.publish(LifecycleState::Stopped);
    }

    fn reap_if_dead(&self, slot: &mut Option<RunningServer>) {
        let exited = slot
            .as_mut()
            .is_some_and(|server| !server.process.is_alive());
        if exited {
            let pid = slot.take().and_then(|server| server.process.pid());
            warn!(?pid, "Server exited unexpectedly");
            self.publish(LifecycleState::Stopped);
        }
    }

    fn publish(&self, state: LifecycleState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}
