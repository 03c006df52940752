//! Error types used by the tailvisor runtime and its tail workers.
//!
//! This module defines:
//!
//! - [`RuntimeError`]: errors raised by the coordinator runtime itself.
//! - [`Fault`]: a failure raised inside a tail worker, tagged with a [`FaultKind`]
//!   at the point of failure so the restart policy never has to inspect an opaque error.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the tailvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers did not release their files in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Paths whose workers did not exit in time.
        stuck: Vec<String>,
    },

    /// The coordinator loop is gone (already shut down).
    #[error("coordinator is closed")]
    Closed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tailvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::Closed.as_label(), "runtime_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Closed => "runtime_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Closed => "coordinator closed".to_string(),
        }
    }
}

/// Explicit classification tag attached to every [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Offset/length arithmetic failed (overflow, out-of-range conversion).
    /// Never corrupts the cursor because the cursor is only written after a successful step.
    Arithmetic,
    /// The platform or file system does not support the attempted operation.
    Unsupported,
    /// The tailed file does not exist (absent at start or deleted mid-tail).
    NotFound,
    /// Any other I/O failure while opening, stat-ing or reading the file.
    Io,
    /// The change-notification subscription failed.
    Watch,
    /// The worker panicked.
    Panic,
}

impl FaultKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FaultKind::Arithmetic => "arithmetic",
            FaultKind::Unsupported => "unsupported",
            FaultKind::NotFound => "not_found",
            FaultKind::Io => "io",
            FaultKind::Watch => "watch",
            FaultKind::Panic => "panic",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # Failure raised inside a tail worker.
///
/// The producer of a fault picks its [`FaultKind`]; the coordinator decides what to do
/// with it purely from that tag (see [`RestartPolicy::classify`](crate::RestartPolicy::classify)).
///
/// # Example
/// ```
/// use tailvisor::{Fault, FaultKind};
///
/// let io = std::io::Error::new(std::io::ErrorKind::Unsupported, "no seek");
/// let fault = Fault::from(io);
/// assert_eq!(fault.kind(), FaultKind::Unsupported);
/// assert_eq!(fault.as_label(), "fault_unsupported");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} fault: {message}")]
pub struct Fault {
    kind: FaultKind,
    message: String,
}

impl Fault {
    /// Creates a fault with an explicit kind.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for [`FaultKind::Arithmetic`].
    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Arithmetic, message)
    }

    /// Shorthand for [`FaultKind::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Unsupported, message)
    }

    /// Shorthand for [`FaultKind::Io`].
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Io, message)
    }

    /// Returns the classification tag.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Returns the underlying message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.kind {
            FaultKind::Arithmetic => "fault_arithmetic",
            FaultKind::Unsupported => "fault_unsupported",
            FaultKind::NotFound => "fault_not_found",
            FaultKind::Io => "fault_io",
            FaultKind::Watch => "fault_watch",
            FaultKind::Panic => "fault_panic",
        }
    }

    /// Returns a human-readable message with details about the fault.
    pub fn as_message(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl From<io::Error> for Fault {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::Unsupported => FaultKind::Unsupported,
            io::ErrorKind::NotFound => FaultKind::NotFound,
            _ => FaultKind::Io,
        };
        Fault::new(kind, err.to_string())
    }
}

impl From<notify::Error> for Fault {
    fn from(err: notify::Error) -> Self {
        Fault::new(FaultKind::Watch, err.to_string())
    }
}
