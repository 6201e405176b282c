// src/exec/process.rs

//! Graceful termination of the managed child.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

use crate::errors::{DevloopError, Result};

/// Send SIGTERM to `child` and wait for it to exit.
///
/// With `grace = Some(d)`, a child still alive after `d` is force-killed and
/// awaited. With `None` this waits indefinitely. The returned status is only
/// produced after the exit has been observed, so a caller may start a
/// replacement as soon as this returns `Ok`.
pub async fn terminate_and_wait(
    child: &mut Child,
    pid: u32,
    grace: Option<Duration>,
) -> Result<ExitStatus> {
    debug!(pid, "sending termination signal");
    send_terminate(child, pid).map_err(|source| DevloopError::ProcessSignal { pid, source })?;

    let waited = match grace {
        Some(grace) => match tokio::time::timeout(grace, child.wait()).await {
            Ok(res) => res,
            Err(_) => {
                warn!(pid, ?grace, "process ignored termination signal; killing");
                match child.kill().await {
                    Ok(()) => child.wait().await,
                    Err(e) => Err(e),
                }
            }
        },
        None => child.wait().await,
    };

    waited.map_err(|source| DevloopError::ProcessWait { pid, source })
}

#[cfg(unix)]
fn send_terminate(_child: &mut Child, pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)
}

// No SIGTERM equivalent; terminate outright.
#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.start_kill()
}
