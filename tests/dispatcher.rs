// tests/dispatcher.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio::time::sleep;

use devloop::engine::{Debouncer, Dispatch, EventDispatcher, RestartHandle, classify};
use devloop::errors::DevloopError;
use devloop::watch::{FsEvent, FsOp, SessionStreams, lost_events_error};

type TestResult = Result<(), Box<dyn Error>>;

const BINARY: &str = "/project/runner";
const BUILD_WINDOW: Duration = Duration::from_secs(2);

fn op_strategy() -> impl Strategy<Value = FsOp> {
    prop_oneof![
        Just(FsOp::Create),
        Just(FsOp::Write),
        Just(FsOp::Remove),
        Just(FsOp::Rename),
        Just(FsOp::Chmod),
    ]
}

proptest! {
    #[test]
    fn binary_path_is_always_ignored(op in op_strategy()) {
        let event = FsEvent::new(BINARY, op);
        prop_assert_eq!(classify(&event, &PathBuf::from(BINARY)), Dispatch::Ignore);
    }

    #[test]
    fn other_paths_always_rebuild(op in op_strategy(), name in "[a-z]{1,12}(\\.go)?") {
        let event = FsEvent::new(format!("/project/{name}"), op);
        let dispatch = classify(&event, &PathBuf::from(BINARY));
        if name == "runner" {
            prop_assert_eq!(dispatch, Dispatch::Ignore);
        } else if op == FsOp::Write {
            prop_assert_eq!(dispatch, Dispatch::Rebuild);
        } else {
            prop_assert_eq!(dispatch, Dispatch::RebuildAndRestart);
        }
    }
}

#[test]
fn only_pure_writes_skip_the_restart() {
    let binary = PathBuf::from(BINARY);
    let at = |op| classify(&FsEvent::new("/project/main.go", op), &binary);

    assert_eq!(at(FsOp::Write), Dispatch::Rebuild);
    assert_eq!(at(FsOp::Create), Dispatch::RebuildAndRestart);
    assert_eq!(at(FsOp::Remove), Dispatch::RebuildAndRestart);
    assert_eq!(at(FsOp::Rename), Dispatch::RebuildAndRestart);
    assert_eq!(at(FsOp::Chmod), Dispatch::RebuildAndRestart);

    // Same file name elsewhere in the tree is not our output.
    assert_eq!(
        classify(&FsEvent::new("/project/cmd/runner", FsOp::Write), &binary),
        Dispatch::Rebuild
    );
}

/// A dispatcher wired to inspectable channels.
struct Harness {
    build_fires: mpsc::Receiver<()>,
    restarts: mpsc::Receiver<()>,
    sessions: mpsc::Sender<SessionStreams>,
    task: tokio::task::JoinHandle<devloop::errors::Result<()>>,
}

struct FakeSession {
    events: mpsc::UnboundedSender<FsEvent>,
    errors: mpsc::UnboundedSender<notify::Error>,
}

fn harness() -> Harness {
    let (fire_tx, build_fires) = mpsc::channel::<()>(1);
    let build = Debouncer::spawn("build", BUILD_WINDOW, fire_tx);
    let (restart_tx, restarts) = mpsc::channel::<()>(64);
    let (sessions, sessions_rx) = mpsc::channel::<SessionStreams>(4);

    let dispatcher = EventDispatcher::new(
        PathBuf::from(BINARY),
        build,
        RestartHandle::new(restart_tx),
        sessions_rx,
    );

    Harness {
        build_fires,
        restarts,
        sessions,
        task: tokio::spawn(dispatcher.run()),
    }
}

async fn open_session(h: &Harness, id: u64) -> FakeSession {
    let (events, events_rx) = mpsc::unbounded_channel();
    let (errors, errors_rx) = mpsc::unbounded_channel();
    h.sessions
        .send(SessionStreams {
            id,
            events: events_rx,
            errors: errors_rx,
        })
        .await
        .expect("dispatcher alive");
    FakeSession { events, errors }
}

fn drain(rx: &mut mpsc::Receiver<()>) -> usize {
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}

#[tokio::test(start_paused = true)]
async fn writes_within_one_window_trigger_one_build_and_no_restart() -> TestResult {
    init_tracing();

    let mut h = harness();
    let session = open_session(&h, 1).await;

    for i in 0..20 {
        session
            .events
            .send(FsEvent::new(format!("/project/file{i}.go"), FsOp::Write))?;
        sleep(Duration::from_millis(10)).await;
    }

    sleep(BUILD_WINDOW * 2).await;
    assert_eq!(drain(&mut h.build_fires), 1);
    assert_eq!(drain(&mut h.restarts), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn structural_events_request_a_restart_each() -> TestResult {
    let mut h = harness();
    let session = open_session(&h, 1).await;

    session.events.send(FsEvent::new("/project/newdir", FsOp::Create))?;
    session.events.send(FsEvent::new("/project/old", FsOp::Remove))?;
    session.events.send(FsEvent::new("/project/moved", FsOp::Rename))?;
    sleep(Duration::from_millis(1)).await;

    // Restart requests are coalesced by the watcher controller, not here.
    assert_eq!(drain(&mut h.restarts), 3);

    sleep(BUILD_WINDOW * 2).await;
    assert_eq!(drain(&mut h.build_fires), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn build_output_never_triggers_anything() -> TestResult {
    let mut h = harness();
    let session = open_session(&h, 1).await;

    for op in [FsOp::Create, FsOp::Write, FsOp::Remove, FsOp::Rename, FsOp::Chmod] {
        session.events.send(FsEvent::new(BINARY, op))?;
    }

    sleep(BUILD_WINDOW * 2).await;
    assert_eq!(drain(&mut h.build_fires), 0);
    assert_eq!(drain(&mut h.restarts), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn waits_for_the_first_session_without_failing() -> TestResult {
    let h = harness();

    sleep(Duration::from_secs(30)).await;
    assert!(!h.task.is_finished(), "dispatcher must wait for a session");

    let session = open_session(&h, 1).await;
    session.events.send(FsEvent::new("/project/main.go", FsOp::Write))?;

    let mut h = h;
    sleep(BUILD_WINDOW * 2).await;
    assert_eq!(drain(&mut h.build_fires), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn follows_the_newest_session() -> TestResult {
    let mut h = harness();
    let first = open_session(&h, 1).await;
    let second = open_session(&h, 2).await;
    sleep(Duration::from_millis(1)).await;

    // The replaced session's stream is no longer consumed.
    first.events.send(FsEvent::new("/project/a", FsOp::Create)).ok();
    second.events.send(FsEvent::new("/project/b", FsOp::Write))?;
    sleep(Duration::from_millis(1)).await;
    assert_eq!(drain(&mut h.restarts), 0);

    // Closing the active session parks the dispatcher until the next one.
    drop(second);
    sleep(Duration::from_millis(1)).await;
    assert!(!h.task.is_finished());

    let third = open_session(&h, 3).await;
    third.events.send(FsEvent::new("/project/c", FsOp::Create))?;
    sleep(Duration::from_millis(1)).await;
    assert_eq!(drain(&mut h.restarts), 1);

    drop(first);
    Ok(())
}

#[tokio::test]
async fn lost_events_end_the_dispatcher() -> TestResult {
    let h = harness();
    let session = open_session(&h, 1).await;

    let overflow = notify::Event::new(notify::EventKind::Other)
        .set_flag(notify::event::Flag::Rescan);
    let err = lost_events_error(&overflow).expect("overflow is an error");
    session.errors.send(err)?;
    // Events queued behind the overflow are not acted on.
    session.events.send(FsEvent::new("/project/main.go", FsOp::Write))?;

    let result = with_timeout(h.task).await?;
    assert!(
        matches!(result, Err(DevloopError::EventSource { .. })),
        "got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn watch_error_is_fatal() -> TestResult {
    init_tracing();

    let h = harness();
    let session = open_session(&h, 1).await;
    session.errors.send(notify::Error::generic("inotify queue overflow"))?;

    let result = with_timeout(h.task).await?;
    match result {
        Err(ref err @ DevloopError::EventSource { .. }) => {
            assert!(err.is_fatal());
            assert!(err.backtrace().is_some());
        }
        other => panic!("Expected EventSource error, got: {:?}", other),
    }

    Ok(())
}
