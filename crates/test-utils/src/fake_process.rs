use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devloop::errors::{DevloopError, Result};
use devloop::exec::{BoxFuture, ManagedProcess, ProcessBackend};

/// One step the backend was asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOp {
    Build,
    Stop(u32),
    Spawn(u32),
}

#[derive(Debug, Default)]
struct FakeProcessState {
    ops: Vec<ProcessOp>,
    alive: Vec<u32>,
    max_alive: usize,
    next_pid: u32,
    failing_builds: usize,
    fail_next_stop: bool,
    fail_next_spawn: bool,
    build_delay: Duration,
    stop_delay: Duration,
}

/// A process backend that runs nothing and:
/// - records the build / stop / spawn sequence
/// - tracks which fake pids are "alive" and the highest number ever alive
///   at once
/// - can be told to fail builds, stops or spawns, or to take time doing them.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessBackend {
    state: Arc<Mutex<FakeProcessState>>,
}

/// Process handle produced by [`FakeProcessBackend`].
#[derive(Debug)]
pub struct FakeProcess {
    pid: u32,
}

impl ManagedProcess for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }
}

impl FakeProcessBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_pid = 1000;
        backend
    }

    pub fn fail_next_builds(&self, n: usize) {
        self.state.lock().unwrap().failing_builds = n;
    }

    pub fn fail_next_stop(&self) {
        self.state.lock().unwrap().fail_next_stop = true;
    }

    pub fn fail_next_spawn(&self) {
        self.state.lock().unwrap().fail_next_spawn = true;
    }

    pub fn set_build_delay(&self, delay: Duration) {
        self.state.lock().unwrap().build_delay = delay;
    }

    pub fn set_stop_delay(&self, delay: Duration) {
        self.state.lock().unwrap().stop_delay = delay;
    }

    pub fn ops(&self) -> Vec<ProcessOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn builds(&self) -> usize {
        self.ops().iter().filter(|op| **op == ProcessOp::Build).count()
    }

    pub fn alive(&self) -> Vec<u32> {
        self.state.lock().unwrap().alive.clone()
    }

    pub fn max_alive(&self) -> usize {
        self.state.lock().unwrap().max_alive
    }
}

impl ProcessBackend for FakeProcessBackend {
    type Process = FakeProcess;

    fn build(&mut self) -> BoxFuture<'_, Result<()>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let delay = {
                let mut guard = state.lock().unwrap();
                guard.ops.push(ProcessOp::Build);
                guard.build_delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let mut guard = state.lock().unwrap();
            if guard.failing_builds > 0 {
                guard.failing_builds -= 1;
                return Err(DevloopError::BuildFailed {
                    code: Some(1),
                    stderr: "injected build failure".to_string(),
                });
            }
            Ok(())
        })
    }

    fn stop(&mut self, process: FakeProcess) -> BoxFuture<'_, Result<()>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let pid = process.pid;
            let (delay, fail) = {
                let mut guard = state.lock().unwrap();
                guard.ops.push(ProcessOp::Stop(pid));
                (guard.stop_delay, std::mem::take(&mut guard.fail_next_stop))
            };

            if fail {
                return Err(DevloopError::ProcessSignal {
                    pid,
                    source: io::Error::other("injected signal failure"),
                });
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            state.lock().unwrap().alive.retain(|p| *p != pid);
            Ok(())
        })
    }

    fn spawn(&mut self) -> BoxFuture<'_, Result<FakeProcess>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let mut guard = state.lock().unwrap();
            if std::mem::take(&mut guard.fail_next_spawn) {
                return Err(DevloopError::ProcessSpawn {
                    path: "runner".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "injected spawn failure"),
                });
            }

            guard.next_pid += 1;
            let pid = guard.next_pid;
            guard.ops.push(ProcessOp::Spawn(pid));
            guard.alive.push(pid);
            guard.max_alive = guard.max_alive.max(guard.alive.len());
            Ok(FakeProcess { pid })
        })
    }
}
