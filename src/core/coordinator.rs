//! # Coordinator: owns tail workers and applies the restart policy.
//!
//! [`Coordinator`] is a cheap, cloneable handle. All state lives in a single loop task
//! that consumes commands from handles and signals from workers, one at a time.
//!
//! ## Architecture
//! ```text
//! Coordinator (handle) ── Command ──►┐
//!                                    ├──► CoordinatorLoop ──► Registry (path → WorkerRecord)
//! TailWorker ── WorkerSignal ───────►┘          │
//!      ▲                                        ├─► spawn TailWorker (generation n)
//!      └──────── Directive (oneshot) ◄──────────┘
//! ```
//!
//! ## Fault handling
//! ```text
//! WorkerSignal::Failed{path, gen, fault}
//!   ├─ gen is not current  ─► reply Stop, ignore
//!   └─ policy.decide(window, fault.kind)
//!        ├─ Resume  ─► reply Resume                       (WorkerFailed, WorkerResumed)
//!        ├─ Restart ─► reply Restart, spawn gen+1         (WorkerFailed, WorkerRestarted)
//!        └─ Stop    ─► reply Stop, remove, FileError      (WorkerFailed, WorkerDead)
//! ```
//!
//! ## Rules
//! - The loop never awaits a worker except during shutdown.
//! - Faults of one worker never touch another worker's record.
//! - The reporter sees a terminal event before a worker disappears.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::config::CoordinatorConfig;
use crate::core::registry::{Registry, WorkerHandle, WorkerInfo, WorkerRecord};
use crate::core::shutdown;
use crate::error::{Fault, FaultKind, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Directive, RestartWindow};
use crate::subscribers::ReportQueue;
use crate::tail::{StopRequest, TailRequest, TailWorker, WorkerParams, WorkerSignal};

/// Requests from handles to the loop.
pub(crate) enum Command {
    Begin(TailRequest),
    Stop(PathBuf),
    Inject { path: PathBuf, fault: Fault },
    List(oneshot::Sender<Vec<WorkerInfo>>),
    Shutdown(oneshot::Sender<Result<(), RuntimeError>>),
}

/// Handle to the tailing runtime.
///
/// Created by [`Coordinator::builder`]. Clones share the same runtime; when the last
/// clone is dropped the runtime shuts down.
///
/// ## Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tailvisor::{Coordinator, CoordinatorConfig, Event, Subscribe, TailRequest};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Subscribe for Printer {
///     async fn on_event(&self, ev: &Event) {
///         if let Some(line) = ev.line.as_deref() {
///             println!("{}: {line}", ev.path_display());
///         }
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
///     coordinator.begin_tail(TailRequest::new("/var/log/syslog", Arc::new(Printer)))?;
///     coordinator.run_until_signal().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    commands: mpsc::UnboundedSender<Command>,
    bus: Bus,
}

impl Coordinator {
    /// Starts building a coordinator.
    pub fn builder(cfg: CoordinatorConfig) -> crate::core::builder::CoordinatorBuilder {
        crate::core::builder::CoordinatorBuilder::new(cfg)
    }

    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, bus: Bus) -> Self {
        Self { commands, bus }
    }

    /// Starts tailing the requested path.
    ///
    /// Idempotent: a request for a path that already has a live worker is absorbed.
    pub fn begin_tail(&self, request: TailRequest) -> Result<(), RuntimeError> {
        self.send(Command::Begin(request))
    }

    /// Stops tailing a path. No-op if nothing tails it.
    pub fn stop_tail(&self, request: StopRequest) -> Result<(), RuntimeError> {
        self.send(Command::Stop(request.into_path()))
    }

    /// Raises `fault` inside the worker tailing `path` as if its current step had failed.
    ///
    /// Ignored if nothing tails `path`. Useful to exercise restart policies.
    pub fn inject_fault(&self, path: impl Into<PathBuf>, fault: Fault) -> Result<(), RuntimeError> {
        self.send(Command::Inject {
            path: path.into(),
            fault,
        })
    }

    /// Returns the live workers sorted by path.
    pub async fn list(&self) -> Result<Vec<WorkerInfo>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::List(tx))?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Creates a receiver that observes every subsequent event on the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops every worker and waits up to `grace` for them to release their files.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        rx.await.map_err(|_| RuntimeError::Closed)?
    }

    /// Waits for a termination signal, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        if let Err(e) = shutdown::wait_for_shutdown_signal().await {
            tracing::warn!(error = %e, "signal handlers unavailable; shutting down");
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown().await
    }

    fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.commands.send(cmd).map_err(|_| RuntimeError::Closed)
    }
}

/// Spawns worker generations.
struct WorkerFactory {
    signals: mpsc::UnboundedSender<WorkerSignal>,
    runtime_token: CancellationToken,
    poll_interval: Duration,
}

impl WorkerFactory {
    fn spawn(&self, path: &Arc<Path>, generation: u64, reporter: &ReportQueue) -> WorkerHandle {
        let cancel = self.runtime_token.child_token();
        let (injector, injected) = mpsc::unbounded_channel();
        let worker = TailWorker::new(
            WorkerParams {
                path: Arc::clone(path),
                generation,
                reporter: reporter.clone(),
                signals: self.signals.clone(),
                poll_interval: self.poll_interval,
            },
            injected,
        );
        let join = tokio::spawn(worker.supervised(cancel.clone()));
        WorkerHandle {
            cancel,
            injector,
            join,
        }
    }
}

/// The single task that owns the registry.
pub(crate) struct CoordinatorLoop {
    cfg: CoordinatorConfig,
    bus: Bus,
    registry: Registry,
    factory: WorkerFactory,
    commands: mpsc::UnboundedReceiver<Command>,
    signals: mpsc::UnboundedReceiver<WorkerSignal>,
    runtime_token: CancellationToken,
}

impl CoordinatorLoop {
    pub(crate) fn new(
        cfg: CoordinatorConfig,
        bus: Bus,
        commands: mpsc::UnboundedReceiver<Command>,
        runtime_token: CancellationToken,
    ) -> Self {
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let factory = WorkerFactory {
            signals: signals_tx,
            runtime_token: runtime_token.clone(),
            poll_interval: cfg.poll_interval_clamped(),
        };
        Self {
            cfg,
            bus,
            registry: Registry::default(),
            factory,
            commands,
            signals,
            runtime_token,
        }
    }

    /// Processes commands and signals until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(signal) = self.signals.recv() => self.on_signal(signal),
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown(reply)) => {
                        let res = self.shutdown().await;
                        let _ = reply.send(res);
                        break;
                    }
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        if let Err(e) = self.shutdown().await {
                            tracing::warn!(error = %e, "shutdown after last handle dropped");
                        }
                        break;
                    }
                },
            }
        }
        tracing::debug!("coordinator loop exited");
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Begin(req) => self.begin_tail(req),
            Command::Stop(path) => self.stop_tail(&path),
            Command::Inject { path, fault } => {
                if let Some(record) = self.registry.get(&path) {
                    let _ = record.handle.injector.send(fault);
                }
            }
            Command::List(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::Shutdown(_) => {}
        }
    }

    fn on_signal(&mut self, signal: WorkerSignal) {
        match signal {
            WorkerSignal::Failed {
                path,
                generation,
                fault,
                reply,
            } => {
                let directive = self.on_worker_failure(&path, generation, fault);
                let _ = reply.send(directive);
            }
            WorkerSignal::Panicked {
                path,
                generation,
                info,
            } => {
                self.on_worker_failure(&path, generation, Fault::new(FaultKind::Panic, info));
            }
            WorkerSignal::Finished { path, generation } => {
                if self.registry.current_mut(&path, generation).is_some() {
                    self.registry.remove(&path);
                    tracing::debug!(path = %path.display(), generation, "worker finished; record removed");
                }
            }
        }
    }

    /// BeginTail: spawn generation 1 unless the path is already tailed.
    fn begin_tail(&mut self, req: TailRequest) {
        let (path, reporter) = req.into_parts();
        self.bus
            .publish(Event::new(EventKind::TailRequested).with_path(&path));

        if self.registry.contains(&path) {
            tracing::debug!(path = %path.display(), "already tailing; request absorbed");
            return;
        }

        let path: Arc<Path> = Arc::from(path);
        let reporter = ReportQueue::spawn(reporter, self.bus.clone());
        let handle = self.factory.spawn(&path, 1, &reporter);
        self.registry.insert(WorkerRecord {
            path: Arc::clone(&path),
            generation: 1,
            window: RestartWindow::new(),
            reporter,
            handle,
        });

        tracing::info!(path = %path.display(), "tailing started");
        self.bus.publish(
            Event::new(EventKind::TailStarted)
                .with_shared_path(&path)
                .with_generation(1),
        );
    }

    /// StopTail: cancel and forget. The worker announces `TailStopped` itself once it
    /// has finished its current step.
    fn stop_tail(&mut self, path: &Path) {
        if let Some(record) = self.registry.remove(path) {
            record.handle.cancel.cancel();
            tracing::info!(path = %path.display(), "tailing stopped");
        }
    }

    /// OnWorkerFailure: classify, apply the ceiling, act.
    fn on_worker_failure(&mut self, path: &Path, generation: u64, fault: Fault) -> Directive {
        let policy = self.cfg.restart;
        let Some(record) = self.registry.current_mut(path, generation) else {
            tracing::debug!(path = %path.display(), generation, "stale worker signal ignored");
            return Directive::Stop;
        };

        let directive = policy.decide(&mut record.window, fault.kind(), Instant::now());
        tracing::warn!(
            path = %path.display(),
            generation,
            fault = %fault,
            directive = directive.as_label(),
            restarts = record.window.restart_count(),
            "worker failure classified"
        );
        self.bus.publish(
            Event::new(EventKind::WorkerFailed)
                .with_shared_path(&record.path)
                .with_generation(generation)
                .with_fault(fault.clone())
                .with_directive(directive),
        );

        match directive {
            Directive::Resume => {
                self.bus.publish(
                    Event::new(EventKind::WorkerResumed)
                        .with_shared_path(&record.path)
                        .with_generation(generation),
                );
            }
            Directive::Restart => {
                let next = generation + 1;
                record.handle = self.factory.spawn(&record.path, next, &record.reporter);
                record.generation = next;
                self.bus.publish(
                    Event::new(EventKind::WorkerRestarted)
                        .with_shared_path(&record.path)
                        .with_generation(next)
                        .with_restart_count(record.window.restart_count()),
                );
            }
            Directive::Stop => {
                // Not cancelled: the worker is parked on its reply and exits silently on `Stop`.
                if let Some(record) = self.registry.remove(path) {
                    record.reporter.send(
                        Event::new(EventKind::FileError)
                            .with_shared_path(&record.path)
                            .with_generation(generation)
                            .with_fault(fault.clone()),
                    );
                    self.bus.publish(
                        Event::new(EventKind::WorkerDead)
                            .with_shared_path(&record.path)
                            .with_generation(generation)
                            .with_fault(fault)
                            .with_restart_count(record.window.restart_count()),
                    );
                }
            }
        }
        directive
    }

    /// Cancels every worker and waits for them within the grace period.
    async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        let records = self.registry.drain();
        for record in &records {
            record.handle.cancel.cancel();
        }

        let grace = self.cfg.grace;
        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();
        for record in records {
            let mut join = record.handle.join;
            if tokio::time::timeout_at(deadline, &mut join).await.is_err() {
                join.abort();
                stuck.push(record.path.display().to_string());
            }
        }
        self.runtime_token.cancel();

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            stuck.sort_unstable();
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;

    struct Forward(mpsc::UnboundedSender<Event>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, ev: &Event) {
            let _ = self.0.send(ev.clone());
        }
    }

    struct Fixture {
        looped: CoordinatorLoop,
        path: PathBuf,
        events: mpsc::UnboundedReceiver<Event>,
        _commands: mpsc::UnboundedSender<Command>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn tailing() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("app.log");
            std::fs::write(&path, "").unwrap();

            let cfg = CoordinatorConfig {
                poll_interval: Duration::from_millis(20),
                ..CoordinatorConfig::default()
            };
            let (commands, commands_rx) = mpsc::unbounded_channel();
            let mut looped =
                CoordinatorLoop::new(cfg, Bus::new(256), commands_rx, CancellationToken::new());

            let (tx, events) = mpsc::unbounded_channel();
            looped.begin_tail(TailRequest::new(&path, Arc::new(Forward(tx))));
            Self {
                looped,
                path,
                events,
                _commands: commands,
                _dir: dir,
            }
        }

        fn current(&self) -> WorkerInfo {
            self.looped.registry.snapshot().remove(0)
        }

        fn fail(&mut self, kind: FaultKind) -> Directive {
            let generation = self.current().generation;
            self.looped
                .on_worker_failure(&self.path, generation, Fault::new(kind, "test"))
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            self.looped.runtime_token.cancel();
        }
    }

    #[tokio::test]
    async fn test_stale_generation_is_answered_with_stop() {
        let mut fx = Fixture::tailing();
        assert_eq!(fx.fail(FaultKind::Io), Directive::Restart);
        assert_eq!(fx.current().generation, 2);

        let (reply, answer) = oneshot::channel();
        fx.looped.on_signal(WorkerSignal::Failed {
            path: Arc::from(fx.path.as_path()),
            generation: 1,
            fault: Fault::io("late"),
            reply,
        });
        assert_eq!(answer.await.unwrap(), Directive::Stop);

        let live = fx.current();
        assert_eq!(live.generation, 2);
        assert_eq!(live.restart_count, 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(ev) = fx.events.try_recv() {
            assert_ne!(ev.kind, EventKind::FileError);
        }
    }

    #[tokio::test]
    async fn test_panicked_worker_is_restarted() {
        let mut fx = Fixture::tailing();
        let mut bus = fx.looped.bus.subscribe();

        fx.looped.on_signal(WorkerSignal::Panicked {
            path: Arc::from(fx.path.as_path()),
            generation: 1,
            info: "boom".to_string(),
        });

        let live = fx.current();
        assert_eq!(live.generation, 2);
        assert_eq!(live.restart_count, 1);

        let failed = loop {
            let ev = bus.try_recv().unwrap();
            if ev.kind == EventKind::WorkerFailed {
                break ev;
            }
        };
        assert_eq!(failed.directive, Some(Directive::Restart));
        assert_eq!(failed.fault.as_ref().map(Fault::kind), Some(FaultKind::Panic));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_counts_from_first_failure_not_from_spawn() {
        let mut fx = Fixture::tailing();

        tokio::time::advance(Duration::from_secs(25)).await;
        for _ in 0..5 {
            assert_eq!(fx.fail(FaultKind::Io), Directive::Restart);
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(fx.fail(FaultKind::Io), Directive::Stop);
        assert!(fx.looped.registry.snapshot().is_empty());
    }
}
