// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The build controller talks to a `ProcessBackend` instead of spawning
//! commands itself. This keeps the ordering logic (build, stop old, start
//! new) testable without a toolchain:
//!
//! - `CommandBackend` is the implementation used by `devloop`. It invokes
//!   `<build_program> build -o <binary> .` and runs `<root>/<binary>`.
//! - Tests provide their own `ProcessBackend` that records each step.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::SupervisorConfig;
use crate::errors::{DevloopError, Result};
use crate::exec::process::terminate_and_wait;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A started program the backend knows how to stop.
pub trait ManagedProcess: Send + 'static {
    fn pid(&self) -> u32;
}

/// Trait abstracting the build toolchain and the managed program.
pub trait ProcessBackend: Send + 'static {
    type Process: ManagedProcess;

    /// Build the binary. Must not touch any running process.
    fn build(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Stop `process` and resolve only once its exit has been observed.
    fn stop(&mut self, process: Self::Process) -> BoxFuture<'_, Result<()>>;

    /// Start the freshly built binary.
    fn spawn(&mut self) -> BoxFuture<'_, Result<Self::Process>>;
}

/// The built program running as a child of the supervisor.
#[derive(Debug)]
pub struct RunningProcess {
    pid: u32,
    child: Child,
}

impl ManagedProcess for RunningProcess {
    fn pid(&self) -> u32 {
        self.pid
    }
}

/// Real backend used in production.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: Arc<SupervisorConfig>,
}

impl CommandBackend {
    pub fn new(config: Arc<SupervisorConfig>) -> Self {
        Self { config }
    }
}

impl ProcessBackend for CommandBackend {
    type Process = RunningProcess;

    fn build(&mut self) -> BoxFuture<'_, Result<()>> {
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let program = config.build_program().to_string();
            let args = config.build_args();
            debug!(program = %program, ?args, "invoking build toolchain");

            let output = Command::new(&program)
                .args(&args)
                .current_dir(config.root())
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| DevloopError::BuildLaunch {
                    program: program.clone(),
                    source,
                })?;

            if !output.status.success() {
                return Err(DevloopError::BuildFailed {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            info!(binary = ?config.binary_path(), "build succeeded");
            Ok(())
        })
    }

    fn stop(&mut self, process: RunningProcess) -> BoxFuture<'_, Result<()>> {
        let grace = self.config.stop_timeout();

        Box::pin(async move {
            let RunningProcess { pid, mut child } = process;
            let status = terminate_and_wait(&mut child, pid, grace).await?;
            debug!(pid, ?status, "previous process exited");
            Ok(())
        })
    }

    fn spawn(&mut self) -> BoxFuture<'_, Result<RunningProcess>> {
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let path = config.binary_path();

            let child = Command::new(&path)
                .current_dir(config.root())
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|source| DevloopError::ProcessSpawn {
                    path: path.clone(),
                    source,
                })?;

            // `id()` is only `None` once the child has been reaped, which
            // cannot have happened yet.
            let pid = child.id().ok_or_else(|| DevloopError::ProcessSpawn {
                path: path.clone(),
                source: io::Error::other("process exited before its pid was read"),
            })?;

            Ok(RunningProcess { pid, child })
        })
    }
}
