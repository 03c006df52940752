//! # Events emitted by the coordinator and tail workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Tail events**: what a worker observed in its file (lines, missing file, errors)
//! - **Management events**: coordinator decisions (started, stopped, resumed, restarted, dead)
//! - **Runtime events**: subscriber health and shutdown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the tailed path,
//! the observed line, the fault and the worker generation.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events of one worker reach its reporter in emission order; events of different
//! workers may interleave.
//!
//! ## Example
//! ```rust
//! use tailvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::LineObserved)
//!     .with_path("/var/log/app.log")
//!     .with_line("hello world")
//!     .with_generation(1);
//!
//! assert_eq!(ev.kind, EventKind::LineObserved);
//! assert_eq!(ev.line.as_deref(), Some("hello world"));
//! assert!(ev.is_tail_event());
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::Fault;
use crate::policies::Directive;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Tail events (delivered to the request's reporter) ===
    /// Worker opened the file, positioned its cursor at EOF and subscribed to changes.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `generation`: worker generation
    Initialized,

    /// One complete line was appended to the file.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `line`: line text without its terminator
    /// - `generation`: worker generation
    LineObserved,

    /// The file did not exist when the worker started. Terminal.
    ///
    /// Sets:
    /// - `path`: requested file
    FileNotFound,

    /// Tailing ended because of an error (deleted file or a `Stop` directive). Terminal.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `fault`: tagged cause
    FileError,

    // === Management events ===
    /// Tailing was requested for a path.
    ///
    /// Sets:
    /// - `path`: requested file
    TailRequested,

    /// A worker was spawned and registered for a path.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `generation`: worker generation (1 for a fresh request)
    TailStarted,

    /// Tailing was stopped on request. Terminal.
    ///
    /// Sets:
    /// - `path`: tailed file
    TailStopped,

    /// A worker raised a fault and the policy made a decision.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `generation`: failing generation
    /// - `fault`: tagged cause
    /// - `directive`: policy outcome
    WorkerFailed,

    /// The worker keeps running with its cursor untouched.
    ///
    /// Sets:
    /// - `path`, `generation`
    WorkerResumed,

    /// A fresh worker replaced the failed one.
    ///
    /// Sets:
    /// - `path`: tailed file
    /// - `generation`: new generation
    /// - `restart_count`: restarts within the current window
    WorkerRestarted,

    /// The worker was torn down permanently by the policy.
    ///
    /// Sets:
    /// - `path`, `generation`, `fault`, `restart_count`
    WorkerDead,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// All workers stopped within configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Tailed file, if applicable.
    pub path: Option<Arc<Path>>,
    /// Observed line (without terminator).
    pub line: Option<Arc<str>>,
    /// Tagged fault cause.
    pub fault: Option<Fault>,
    /// Policy outcome for a fault.
    pub directive: Option<Directive>,
    /// Worker generation (1-based, per path).
    pub generation: Option<u64>,
    /// Restarts within the current window.
    pub restart_count: Option<u32>,
    /// Human-readable reason (subscriber failures, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            path: None,
            line: None,
            fault: None,
            directive: None,
            generation: None,
            restart_count: None,
            reason: None,
        }
    }

    /// Attaches the tailed path.
    #[inline]
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(Arc::from(path.as_ref()));
        self
    }

    /// Attaches an already shared path without copying it.
    #[inline]
    pub fn with_shared_path(mut self, path: &Arc<Path>) -> Self {
        self.path = Some(Arc::clone(path));
        self
    }

    /// Attaches an observed line.
    #[inline]
    pub fn with_line(mut self, line: impl Into<Arc<str>>) -> Self {
        self.line = Some(line.into());
        self
    }

    /// Attaches a fault.
    #[inline]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Attaches a policy directive.
    #[inline]
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = Some(directive);
        self
    }

    /// Attaches a worker generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a restart count.
    #[inline]
    pub fn with_restart_count(mut self, n: u32) -> Self {
        self.restart_count = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// Returns true for events that describe file content or file state
    /// (the ones a reporter is primarily interested in).
    #[inline]
    pub fn is_tail_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Initialized
                | EventKind::LineObserved
                | EventKind::FileNotFound
                | EventKind::FileError
        )
    }

    /// Returns true if no further events will follow for this path and generation.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::FileNotFound | EventKind::FileError | EventKind::TailStopped
        )
    }

    /// Returns the path as a displayable string, or `"-"` if none is attached.
    pub fn path_display(&self) -> String {
        self.path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TailRequested);
        let b = Event::new(EventKind::TailRequested);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_terminal_kinds() {
        let err = Event::new(EventKind::FileError)
            .with_path("/tmp/x")
            .with_fault(Fault::new(FaultKind::NotFound, "deleted"));
        assert!(err.is_terminal());
        assert!(err.is_tail_event());
        assert_eq!(err.path_display(), "/tmp/x");

        let line = Event::new(EventKind::LineObserved).with_line("a");
        assert!(!line.is_terminal());
        assert_eq!(line.path_display(), "-");
    }
}
