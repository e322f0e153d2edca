//! Fixed-cadence polling loop shared by the log tailer and status poller.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One unit of periodic work.
///
/// A cycle must not fail the loop: errors are logged inside `cycle` and the
/// next tick tries again.
#[async_trait]
pub trait PollCycle: Send + 'static {
    async fn cycle(&mut self);
}

/// Run `work` every `period` until `cancel` fires.
///
/// The first cycle runs immediately. Ticks missed because a cycle overran
/// are skipped rather than replayed. The task yields `work` back on exit.
pub fn spawn_poll_loop<C: PollCycle>(
    name: &'static str,
    mut work: C,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<C> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(loop_name = name, ?period, "Poll loop started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => work.cycle().await,
            }
        }

        debug!(loop_name = name, "Poll loop stopped");
        work
    })
}
