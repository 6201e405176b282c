// tests/supervisor.rs

mod common;
use crate::common::{
    ConfigBuilder, FakeEventSource, FakeProcessBackend, ProcessOp, init_tracing, mkdirs,
    wait_until, with_timeout,
};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use devloop::engine::Supervisor;
use devloop::errors::{DevloopError, Result as DevloopResult};
use devloop::fs::RealFileSystem;
use devloop::watch::{FsEvent, FsOp};

type TestResult = Result<(), Box<dyn Error>>;

const RESTART_WINDOW: Duration = Duration::from_millis(5);
const BUILD_WINDOW: Duration = Duration::from_millis(100);

struct Running {
    _dir: tempfile::TempDir,
    root: PathBuf,
    source: FakeEventSource,
    backend: FakeProcessBackend,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<DevloopResult<()>>,
}

impl Running {
    fn ops(&self) -> Vec<ProcessOp> {
        self.backend.ops()
    }

    async fn wait_for_ops(&self, n: usize) {
        let backend = self.backend.clone();
        wait_until("backend ops", move || backend.ops().len() >= n).await;
    }
}

/// Start a supervisor over a small temp tree and wait until the initial
/// build has started the first process.
async fn start() -> Result<Running, Box<dyn Error>> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().to_path_buf();
    mkdirs(&root, "pkg");

    let config = ConfigBuilder::new(&root)
        .restart_debounce(RESTART_WINDOW)
        .build_debounce(BUILD_WINDOW)
        .build();

    let source = FakeEventSource::new();
    let backend = FakeProcessBackend::new();
    let supervisor = Supervisor::new(
        Arc::new(config),
        source.clone(),
        backend.clone(),
        Arc::new(RealFileSystem),
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(supervisor.run(async move {
        let _ = shutdown_rx.await;
    }));

    let running = Running {
        _dir: dir,
        root,
        source,
        backend,
        shutdown: Some(shutdown_tx),
        task,
    };

    running.wait_for_ops(2).await;
    let source = running.source.clone();
    wait_until("watch session registered", move || source.registered(1).len() == 2).await;

    Ok(running)
}

#[tokio::test]
async fn startup_watches_the_tree_then_builds_and_runs() -> TestResult {
    let r = start().await?;

    assert_eq!(r.ops(), vec![ProcessOp::Build, ProcessOp::Spawn(1001)]);
    assert_eq!(r.source.sessions_created(), 1);
    assert_eq!(r.source.registered(1), vec![r.root.clone(), r.root.join("pkg")]);

    Ok(())
}

#[tokio::test]
async fn burst_of_writes_produces_one_rebuild_and_no_restart() -> TestResult {
    let r = start().await?;

    for i in 0..10 {
        assert!(r.source.emit(FsEvent::new(r.root.join(format!("f{i}.go")), FsOp::Write)));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    r.wait_for_ops(5).await;
    tokio::time::sleep(BUILD_WINDOW * 3).await;

    assert_eq!(
        r.ops(),
        vec![
            ProcessOp::Build,
            ProcessOp::Spawn(1001),
            ProcessOp::Build,
            ProcessOp::Stop(1001),
            ProcessOp::Spawn(1002),
        ]
    );
    assert_eq!(r.source.sessions_created(), 1);
    assert_eq!(r.backend.max_alive(), 1);

    Ok(())
}

#[tokio::test]
async fn writes_to_the_build_output_are_ignored() -> TestResult {
    let r = start().await?;

    let binary = r.root.join("runner");
    for op in [FsOp::Create, FsOp::Write, FsOp::Chmod] {
        assert!(r.source.emit(FsEvent::new(&binary, op)));
    }

    tokio::time::sleep(BUILD_WINDOW * 3).await;
    assert_eq!(r.backend.builds(), 1);
    assert_eq!(r.source.sessions_created(), 1);

    Ok(())
}

#[tokio::test]
async fn new_directory_is_watched_after_a_structural_event() -> TestResult {
    let r = start().await?;

    mkdirs(&r.root, "pkg/sub");
    assert!(r.source.emit(FsEvent::new(r.root.join("pkg/sub"), FsOp::Create)));

    let source = r.source.clone();
    let expected = r.root.join("pkg/sub");
    wait_until("new directory watched", move || source.registered(2).contains(&expected)).await;

    r.wait_for_ops(5).await;
    assert_eq!(r.backend.builds(), 2);
    assert_eq!(r.source.live_sessions(), 1);

    // Events keep flowing through the new session.
    assert!(r.source.emit(FsEvent::new(r.root.join("pkg/sub/x.go"), FsOp::Write)));
    let backend = r.backend.clone();
    wait_until("third build", move || backend.builds() == 3).await;

    Ok(())
}

#[tokio::test]
async fn build_failure_keeps_the_previous_process() -> TestResult {
    let r = start().await?;

    r.backend.fail_next_builds(1);
    assert!(r.source.emit(FsEvent::new(r.root.join("main.go"), FsOp::Write)));
    r.wait_for_ops(3).await;
    tokio::time::sleep(BUILD_WINDOW).await;

    assert_eq!(r.backend.alive(), vec![1001]);
    assert!(!r.task.is_finished(), "build failure must not end the supervisor");

    Ok(())
}

#[tokio::test]
async fn watch_error_terminates_the_supervisor() -> TestResult {
    let r = start().await?;

    assert!(r.source.emit_error(notify::Error::generic("queue overflow")));
    let result = with_timeout(r.task).await?;

    match result {
        Err(DevloopError::EventSource { .. }) => {}
        other => panic!("Expected EventSource error, got: {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_managed_process() -> TestResult {
    let mut r = start().await?;

    if let Some(tx) = r.shutdown.take() {
        let _ = tx.send(());
    }
    let result = with_timeout(r.task).await?;

    assert!(result.is_ok(), "graceful shutdown should succeed: {result:?}");
    assert_eq!(r.backend.ops().last(), Some(&ProcessOp::Stop(1001)));
    assert!(r.backend.alive().is_empty());

    Ok(())
}

#[tokio::test]
async fn watcher_creation_failure_is_fatal_at_startup() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let config = ConfigBuilder::new(dir.path())
        .restart_debounce(RESTART_WINDOW)
        .build_debounce(BUILD_WINDOW)
        .build();

    let source = FakeEventSource::new();
    source.fail_create();
    let backend = FakeProcessBackend::new();

    let supervisor = Supervisor::new(
        Arc::new(config),
        source,
        backend.clone(),
        Arc::new(RealFileSystem),
    );

    let result = with_timeout(supervisor.run(std::future::pending::<()>())).await;
    assert!(matches!(result, Err(DevloopError::WatchInit { .. })), "got {result:?}");

    Ok(())
}
