//! # Worker registry - the coordinator's arena of live workers.
//!
//! Keyed by path; each entry remembers which generation is current so a signal
//! from a replaced generation can be recognised as stale.
//!
//! ## Rules
//! - Owned by the coordinator loop only (no locks, no sharing)
//! - At most one record per path
//! - The record owns the worker's cancel token, fault injector and join handle

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Fault;
use crate::policies::RestartWindow;
use crate::subscribers::ReportQueue;

/// Handles to one running worker generation.
pub(crate) struct WorkerHandle {
    pub cancel: CancellationToken,
    pub injector: mpsc::UnboundedSender<Fault>,
    pub join: JoinHandle<()>,
}

/// Coordinator-side record of a tailed path.
pub(crate) struct WorkerRecord {
    pub path: Arc<Path>,
    pub generation: u64,
    pub window: RestartWindow,
    pub reporter: ReportQueue,
    pub handle: WorkerHandle,
}

impl WorkerRecord {
    fn info(&self) -> WorkerInfo {
        WorkerInfo {
            path: self.path.to_path_buf(),
            generation: self.generation,
            restart_count: self.window.restart_count(),
        }
    }
}

/// Snapshot row describing one live worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Tailed path.
    pub path: PathBuf,
    /// Current generation (1 for a worker that never restarted).
    pub generation: u64,
    /// Restarts counted in the current window.
    pub restart_count: u32,
}

/// Registry of live workers.
#[derive(Default)]
pub(crate) struct Registry {
    records: HashMap<PathBuf, WorkerRecord>,
}

impl Registry {
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    pub fn insert(&mut self, record: WorkerRecord) {
        self.records.insert(record.path.to_path_buf(), record);
    }

    pub fn get(&self, path: &Path) -> Option<&WorkerRecord> {
        self.records.get(path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<WorkerRecord> {
        self.records.remove(path)
    }

    /// Returns the record only if `generation` is the current one.
    pub fn current_mut(&mut self, path: &Path, generation: u64) -> Option<&mut WorkerRecord> {
        self.records
            .get_mut(path)
            .filter(|r| r.generation == generation)
    }

    /// Returns a snapshot sorted by path.
    pub fn snapshot(&self) -> Vec<WorkerInfo> {
        let mut out: Vec<WorkerInfo> = self.records.values().map(WorkerRecord::info).collect();
        out.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub fn drain(&mut self) -> Vec<WorkerRecord> {
        self.records.drain().map(|(_, r)| r).collect()
    }
}
