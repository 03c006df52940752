//! # Change notifications for one tailed file.
//!
//! [`ChangeFeed`] subscribes to the file's parent directory with `notify` and wakes the
//! worker whenever an event names the tailed file. A poll interval runs alongside as a
//! fallback (some file systems and editors never produce a usable event).
//!
//! ```text
//! notify thread ──► callback ── filter by file name ──► [mpsc(16)] ──┐
//!                                                                    ├──► changed()
//! tokio interval (poll_interval) ────────────────────────────────────┘
//! ```
//!
//! Dropping the feed drops the watcher, which unsubscribes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::error::Fault;

/// Wake-up source for a worker in the `Watching` state.
pub(crate) struct ChangeFeed {
    _watcher: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<Result<(), Fault>>,
    poll: Interval,
}

impl ChangeFeed {
    /// Subscribes to changes of `path`.
    ///
    /// If the platform watcher cannot be created the feed degrades to polling only.
    pub(crate) fn subscribe(path: &Path, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let watcher = match Self::watch_parent(path, tx) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "change notifications unavailable; polling only"
                );
                None
            }
        };

        let period = poll_interval.max(Duration::from_millis(1));
        let mut poll = time::interval_at(time::Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            _watcher: watcher,
            rx,
            poll,
        }
    }

    /// Waits for the next notification or poll tick.
    ///
    /// A failure reported by the platform watcher is returned as a `Watch` fault.
    pub(crate) async fn changed(&mut self) -> Result<(), Fault> {
        tokio::select! {
            msg = self.rx.recv() => match msg {
                Some(Ok(())) => {
                    // Coalesce bursts into one read.
                    while let Ok(next) = self.rx.try_recv() {
                        next?;
                    }
                    Ok(())
                }
                Some(Err(fault)) => Err(fault),
                None => {
                    self.poll.tick().await;
                    Ok(())
                }
            },
            _ = self.poll.tick() => Ok(()),
        }
    }

    fn watch_parent(
        path: &Path,
        tx: mpsc::Sender<Result<(), Fault>>,
    ) -> Result<RecommendedWatcher, Fault> {
        let target: Option<OsString> = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == target);
                    if ours {
                        let _ = tx.try_send(Ok(()));
                    }
                }
                Err(e) => {
                    let _ = tx.try_send(Err(Fault::from(e)));
                }
            },
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}
