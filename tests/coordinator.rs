use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tailvisor::{
    Coordinator, CoordinatorConfig, Event, EventKind, Fault, FaultKind, RuntimeError, StopRequest,
    Subscribe, TailRequest,
};
use tokio::sync::mpsc;

struct Forward(mpsc::UnboundedSender<Event>);

#[async_trait]
impl Subscribe for Forward {
    async fn on_event(&self, ev: &Event) {
        let _ = self.0.send(ev.clone());
    }
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        grace: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
        ..CoordinatorConfig::default()
    }
}

fn reporter() -> (Arc<dyn Subscribe>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Forward(tx)), rx)
}

fn scratch(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn append(path: &Path, contents: &str) {
    let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
}

async fn next_kind(rx: &mut mpsc::UnboundedReceiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let ev = rx.recv().await.expect("reporter closed");
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind:?}"))
}

#[tokio::test]
async fn test_duplicate_begin_is_absorbed() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let mut bus = coordinator.subscribe();

    let (first, _rx1) = reporter();
    let (second, _rx2) = reporter();
    coordinator
        .begin_tail(TailRequest::new(&path, first))
        .unwrap();
    coordinator
        .begin_tail(TailRequest::new(&path, second))
        .unwrap();

    let live = coordinator.list().await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].path, path);
    assert_eq!(live[0].generation, 1);

    let mut requested = 0;
    let mut started = 0;
    while let Ok(ev) = bus.try_recv() {
        match ev.kind {
            EventKind::TailRequested => requested += 1,
            EventKind::TailStarted => started += 1,
            _ => {}
        }
    }
    assert_eq!(requested, 2);
    assert_eq!(started, 1);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_appended_lines_arrive_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "old line\n");
    let coordinator = Coordinator::builder(config()).build();
    let (sink, mut rx) = reporter();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    next_kind(&mut rx, EventKind::Initialized).await;

    for chunk in 0..10 {
        let text: String = (0..10).map(|i| format!("line {}\n", chunk * 10 + i)).collect();
        append(&path, &text);
    }

    for expected in 0..100 {
        let ev = next_kind(&mut rx, EventKind::LineObserved).await;
        assert_eq!(ev.line.as_deref(), Some(format!("line {expected}").as_str()));
        assert_eq!(ev.path.as_deref(), Some(path.as_path()));
    }

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_restart_ceiling_stops_worker() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let (sink, mut rx) = reporter();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    let ev = next_kind(&mut rx, EventKind::Initialized).await;
    assert_eq!(ev.generation, Some(1));

    for restart in 1..=5u64 {
        coordinator
            .inject_fault(&path, Fault::io("injected"))
            .unwrap();
        let ev = next_kind(&mut rx, EventKind::Initialized).await;
        assert_eq!(ev.generation, Some(restart + 1));
    }

    let live = coordinator.list().await.unwrap();
    assert_eq!(live[0].generation, 6);
    assert_eq!(live[0].restart_count, 5);

    coordinator
        .inject_fault(&path, Fault::io("injected"))
        .unwrap();
    let ev = next_kind(&mut rx, EventKind::FileError).await;
    assert_eq!(ev.fault.as_ref().map(Fault::kind), Some(FaultKind::Io));
    assert!(coordinator.list().await.unwrap().is_empty());

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_arithmetic_fault_resumes_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let mut bus = coordinator.subscribe();
    let (sink, mut rx) = reporter();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    next_kind(&mut rx, EventKind::Initialized).await;

    coordinator
        .inject_fault(&path, Fault::arithmetic("offset overflow"))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(ev) = bus.recv().await {
                if ev.kind == EventKind::WorkerResumed {
                    break;
                }
            }
        }
    })
    .await
    .expect("no WorkerResumed");

    append(&path, "after resume\n");
    let ev = next_kind(&mut rx, EventKind::LineObserved).await;
    assert_eq!(ev.line.as_deref(), Some("after resume"));
    assert_eq!(ev.generation, Some(1));

    let live = coordinator.list().await.unwrap();
    assert_eq!(live[0].generation, 1);
    assert_eq!(live[0].restart_count, 0);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_fault_stops_without_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let (sink, mut rx) = reporter();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    next_kind(&mut rx, EventKind::Initialized).await;

    coordinator
        .inject_fault(&path, Fault::unsupported("no seek"))
        .unwrap();
    let ev = next_kind(&mut rx, EventKind::FileError).await;
    assert_eq!(ev.fault.as_ref().map(Fault::kind), Some(FaultKind::Unsupported));
    assert_eq!(ev.generation, Some(1));
    assert!(coordinator.list().await.unwrap().is_empty());

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "app.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let (sink, mut rx) = reporter();

    coordinator
        .stop_tail(StopRequest::new(dir.path().join("never.log")))
        .unwrap();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    next_kind(&mut rx, EventKind::Initialized).await;

    coordinator.stop_tail(StopRequest::new(&path)).unwrap();
    next_kind(&mut rx, EventKind::TailStopped).await;

    coordinator.stop_tail(StopRequest::new(&path)).unwrap();
    assert!(coordinator.list().await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_file_is_reported_and_forgotten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.log");
    let coordinator = Coordinator::builder(config()).build();
    let (sink, mut rx) = reporter();

    coordinator.begin_tail(TailRequest::new(&path, sink)).unwrap();
    let ev = next_kind(&mut rx, EventKind::FileNotFound).await;
    assert_eq!(ev.path.as_deref(), Some(path.as_path()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !coordinator.list().await.unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("record not removed");

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_every_worker() {
    let dir = tempfile::tempdir().unwrap();
    let a = scratch(&dir, "a.log", "");
    let b = scratch(&dir, "b.log", "");
    let coordinator = Coordinator::builder(config()).build();
    let mut bus = coordinator.subscribe();
    let (sink, mut rx) = reporter();

    coordinator
        .begin_tail(TailRequest::new(&a, Arc::clone(&sink)))
        .unwrap();
    coordinator.begin_tail(TailRequest::new(&b, sink)).unwrap();
    next_kind(&mut rx, EventKind::Initialized).await;
    next_kind(&mut rx, EventKind::Initialized).await;

    coordinator.shutdown().await.unwrap();

    let mut stopped = Vec::new();
    for _ in 0..2 {
        let ev = next_kind(&mut rx, EventKind::TailStopped).await;
        stopped.extend(ev.path.as_deref().map(Path::to_path_buf));
    }
    stopped.sort();
    assert_eq!(stopped, vec![a, b]);

    let mut saw_all_stopped = false;
    while let Ok(ev) = bus.try_recv() {
        saw_all_stopped |= ev.kind == EventKind::AllStoppedWithin;
    }
    assert!(saw_all_stopped);
    assert!(matches!(coordinator.list().await, Err(RuntimeError::Closed)));
}
