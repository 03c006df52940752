//! # Tail requests.
//!
//! [`TailRequest`] asks the coordinator to start tailing a path and names the reporter
//! that receives the resulting events. [`StopRequest`] asks it to stop.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::subscribers::Subscribe;

/// Start tailing `path` and deliver its events to `reporter`.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tailvisor::{Event, Subscribe, TailRequest};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Subscribe for Printer {
///     async fn on_event(&self, ev: &Event) {
///         println!("{:?} {}", ev.kind, ev.path_display());
///     }
/// }
///
/// let req = TailRequest::new("/var/log/syslog", Arc::new(Printer));
/// assert_eq!(req.path().to_str(), Some("/var/log/syslog"));
/// ```
#[derive(Clone)]
pub struct TailRequest {
    path: PathBuf,
    reporter: Arc<dyn Subscribe>,
}

impl TailRequest {
    /// Creates a new request.
    pub fn new(path: impl Into<PathBuf>, reporter: Arc<dyn Subscribe>) -> Self {
        Self {
            path: path.into(),
            reporter,
        }
    }

    /// Returns the requested path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the reporter.
    pub fn reporter(&self) -> &Arc<dyn Subscribe> {
        &self.reporter
    }

    pub(crate) fn into_parts(self) -> (PathBuf, Arc<dyn Subscribe>) {
        (self.path, self.reporter)
    }
}

impl fmt::Debug for TailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailRequest")
            .field("path", &self.path)
            .field("reporter", &self.reporter.name())
            .finish()
    }
}

/// Stop tailing `path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopRequest {
    path: PathBuf,
}

impl StopRequest {
    /// Creates a new request.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to stop.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn into_path(self) -> PathBuf {
        self.path
    }
}
