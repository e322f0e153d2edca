//! Graceful shutdown of a `tokio::process::Child`: SIGTERM, then SIGKILL.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// How long a child gets to exit after SIGTERM before it is killed.
pub const TERM_GRACE: Duration = Duration::from_secs(5);

/// Shut down a child process and reap it.
///
/// On Unix the child receives SIGTERM and has [`TERM_GRACE`] to exit before
/// SIGKILL. Elsewhere it is killed immediately. An already-exited child is
/// reaped and its status returned.
pub async fn shutdown_child(child: &mut Child) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        shutdown_unix(child, TERM_GRACE).await
    }

    #[cfg(not(unix))]
    {
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        return child.wait().await;
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        // Already gone
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    tracing::warn!(pid, "server ignored SIGTERM, sending SIGKILL");
    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sigterm_stops_cooperative_child() {
        let mut child = spawn("exec sleep 30");
        let status = shutdown_child(&mut child).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_exited_child_is_reaped() {
        let mut child = spawn("exit 3");
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = shutdown_child(&mut child).await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_escalates_to_sigkill() {
        let mut child = spawn("trap '' TERM; while true; do sleep 0.05; done");
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = shutdown_unix(&mut child, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!status.success());
    }
}
