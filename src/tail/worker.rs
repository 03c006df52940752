//! # TailWorker: incremental reader for one file.
//!
//! One worker exists per tailed path and generation. It owns the file handle, the
//! change feed and the cursor; nothing else can see them.
//!
//! ## States
//! ```text
//! Starting ──► Watching ⇄ Reading
//!    │            │          │
//!    │            │          ├── path gone ────────► Finished  (FileError{not_found})
//!    │            │          └── fault ──► escalate ─┬─ Resume  ─► Watching (cursor kept)
//!    │            │                                  ├─ Restart ─► Replaced
//!    │            │                                  └─ Stop    ─► Failed
//!    │            └── cancelled ─────────────────────► Stopped   (TailStopped)
//!    └── file missing ───────────────────────────────► Finished  (FileNotFound)
//! ```
//!
//! ## Rules
//! - Steps run **sequentially**; a worker never reads twice at once.
//! - Cancellation is checked between steps and while waiting, never mid-read.
//! - While a fault is being classified the worker does nothing else.
//! - File handle and watcher are plain owned fields, released on every exit path
//!   (including panics, which unwind through the owning future).

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::{Fault, FaultKind};
use crate::events::{Event, EventKind};
use crate::policies::Directive;
use crate::subscribers::{ReportQueue, panic_message};
use crate::tail::cursor::TailCursor;
use crate::tail::watch::ChangeFeed;

/// Signals a worker sends to its coordinator.
pub(crate) enum WorkerSignal {
    /// A step failed; the worker waits on `reply` for the directive.
    Failed {
        path: Arc<Path>,
        generation: u64,
        fault: Fault,
        reply: oneshot::Sender<Directive>,
    },
    /// The worker panicked; it is already gone.
    Panicked {
        path: Arc<Path>,
        generation: u64,
        info: String,
    },
    /// The worker reached an expected end state (missing or deleted file).
    Finished { path: Arc<Path>, generation: u64 },
}

/// Everything a worker needs besides its injected-fault receiver.
pub(crate) struct WorkerParams {
    pub path: Arc<Path>,
    pub generation: u64,
    pub reporter: ReportQueue,
    pub signals: mpsc::UnboundedSender<WorkerSignal>,
    pub poll_interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerState {
    Starting,
    Watching,
    Reading,
    /// Cancelled through `StopTail` or shutdown.
    Stopped,
    /// Torn down by a `Stop` directive.
    Failed,
    /// Discarded in favour of a fresh generation.
    Replaced,
    /// File missing or deleted.
    Finished,
}

impl WorkerState {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkerState::Stopped
                | WorkerState::Failed
                | WorkerState::Replaced
                | WorkerState::Finished
        )
    }
}

enum Wake {
    Cancelled,
    Changed(Result<(), Fault>),
    Injected(Option<Fault>),
}

pub(crate) struct TailWorker {
    params: WorkerParams,
    state: WorkerState,
    cursor: TailCursor,
    file: Option<File>,
    feed: Option<ChangeFeed>,
    injected: Option<mpsc::UnboundedReceiver<Fault>>,
}

impl TailWorker {
    pub(crate) fn new(params: WorkerParams, injected: mpsc::UnboundedReceiver<Fault>) -> Self {
        Self {
            params,
            state: WorkerState::Starting,
            cursor: TailCursor::at_end(0),
            file: None,
            feed: None,
            injected: Some(injected),
        }
    }

    /// Runs the worker and reports a panic to the coordinator instead of losing it.
    pub(crate) async fn supervised(self, token: CancellationToken) {
        let path = Arc::clone(&self.params.path);
        let generation = self.params.generation;
        let signals = self.params.signals.clone();

        if let Err(panic_err) = std::panic::AssertUnwindSafe(self.run(token))
            .catch_unwind()
            .await
        {
            let info = panic_message(&*panic_err);
            tracing::error!(path = %path.display(), generation, info = %info, "tail worker panicked");
            let _ = signals.send(WorkerSignal::Panicked {
                path,
                generation,
                info,
            });
        }
    }

    /// Drives the state machine until a terminal state.
    async fn run(mut self, token: CancellationToken) {
        tracing::debug!(path = %self.params.path.display(), generation = self.params.generation, "tail worker starting");

        while !self.state.is_terminal() {
            if token.is_cancelled() {
                self.state = WorkerState::Stopped;
                break;
            }
            let step = match self.state {
                WorkerState::Starting => self.start().await,
                WorkerState::Watching => self.watch(&token).await,
                WorkerState::Reading => self.read().await,
                _ => break,
            };
            if let Err(fault) = step {
                self.escalate(fault, &token).await;
            }
        }

        self.release();
        match self.state {
            WorkerState::Stopped => self.emit(Event::new(EventKind::TailStopped)),
            WorkerState::Finished => {
                let _ = self.params.signals.send(WorkerSignal::Finished {
                    path: Arc::clone(&self.params.path),
                    generation: self.params.generation,
                });
            }
            _ => {}
        }
        tracing::debug!(
            path = %self.params.path.display(),
            generation = self.params.generation,
            state = ?self.state,
            "tail worker exited"
        );
    }

    /// Starting: open, position at EOF, subscribe, announce.
    async fn start(&mut self) -> Result<(), Fault> {
        let path = Arc::clone(&self.params.path);
        let file = match File::open(&*path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "file not found");
                self.emit(Event::new(EventKind::FileNotFound));
                self.state = WorkerState::Finished;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(Fault::unsupported(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        self.cursor = TailCursor::at_end(meta.len());
        self.file = Some(file);
        self.feed = Some(ChangeFeed::subscribe(&path, self.params.poll_interval));
        self.state = WorkerState::Watching;

        tracing::debug!(path = %path.display(), offset = meta.len(), "tail cursor positioned at end");
        self.emit(Event::new(EventKind::Initialized));
        Ok(())
    }

    /// Watching: idle until a change, an injected fault or cancellation.
    async fn watch(&mut self, token: &CancellationToken) -> Result<(), Fault> {
        let Some(feed) = self.feed.as_mut() else {
            self.state = WorkerState::Starting;
            return Ok(());
        };
        let injected = &mut self.injected;

        let wake = tokio::select! {
            biased;
            _ = token.cancelled() => Wake::Cancelled,
            fault = next_injected(injected) => Wake::Injected(fault),
            res = feed.changed() => Wake::Changed(res),
        };

        match wake {
            Wake::Cancelled => {
                self.state = WorkerState::Stopped;
                Ok(())
            }
            Wake::Injected(Some(fault)) => Err(fault),
            Wake::Injected(None) => {
                self.injected = None;
                Ok(())
            }
            Wake::Changed(res) => {
                res?;
                self.state = WorkerState::Reading;
                Ok(())
            }
        }
    }

    /// Reading: detect deletion/truncation, read to the observed end, emit complete lines.
    async fn read(&mut self) -> Result<(), Fault> {
        let path = Arc::clone(&self.params.path);
        let len = match fs::metadata(&*path).await {
            Ok(m) => m.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "tailed file was deleted");
                self.emit(
                    Event::new(EventKind::FileError)
                        .with_fault(Fault::new(FaultKind::NotFound, "file was deleted")),
                );
                self.state = WorkerState::Finished;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut cursor = self.cursor;
        if cursor.observe_length(len) {
            tracing::info!(
                path = %path.display(),
                old_length = self.cursor.last_known_length(),
                new_length = len,
                "file truncated; rewinding to start"
            );
            // Follow a rotated file: the path may now name a different inode.
            self.file = Some(File::open(&*path).await?);
        }

        let pending = cursor.pending(len)?;
        if pending == 0 {
            cursor.settle(len);
            self.cursor = cursor;
            self.state = WorkerState::Watching;
            return Ok(());
        }

        if self.file.is_none() {
            self.file = Some(File::open(&*path).await?);
        }
        let Some(file) = self.file.as_mut() else {
            return Err(Fault::io("file handle unavailable"));
        };
        file.seek(SeekFrom::Start(cursor.byte_offset())).await?;
        let mut buf = Vec::with_capacity(pending);
        (&mut *file).take(pending as u64).read_to_end(&mut buf).await?;

        let lines = cursor.consume(&buf)?;
        self.cursor = cursor;
        for line in lines {
            self.emit(Event::new(EventKind::LineObserved).with_line(line));
        }
        self.state = WorkerState::Watching;
        Ok(())
    }

    /// Hands `fault` to the coordinator and waits for its directive.
    async fn escalate(&mut self, fault: Fault, token: &CancellationToken) {
        tracing::warn!(
            path = %self.params.path.display(),
            generation = self.params.generation,
            fault = %fault,
            "tail worker fault"
        );

        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.params.signals.send(WorkerSignal::Failed {
            path: Arc::clone(&self.params.path),
            generation: self.params.generation,
            fault,
            reply: reply_tx,
        });
        if sent.is_err() {
            self.state = WorkerState::Failed;
            return;
        }

        let directive = tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.state = WorkerState::Stopped;
                return;
            }
            d = reply_rx => d.unwrap_or(Directive::Stop),
        };

        self.state = match directive {
            Directive::Resume => match self.state {
                WorkerState::Starting => WorkerState::Starting,
                _ => WorkerState::Watching,
            },
            Directive::Restart => WorkerState::Replaced,
            Directive::Stop => WorkerState::Failed,
        };
    }

    /// Releases the file handle and the change subscription.
    fn release(&mut self) {
        self.file = None;
        self.feed = None;
        self.injected = None;
    }

    fn emit(&self, event: Event) {
        self.params.reporter.send(
            event
                .with_shared_path(&self.params.path)
                .with_generation(self.params.generation),
        );
    }
}

async fn next_injected(rx: &mut Option<mpsc::UnboundedReceiver<Fault>>) -> Option<Fault> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
