//! # LogWriter: console reporter
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout, prefixed with the
//! tailed path so output from several workers stays readable when interleaved.
//!
//! ## Example output
//! ```text
//! [initialized] /var/log/app.log
//! /var/log/app.log: GET /health 200
//! [file-not-found] /var/log/missing.log
//! [worker-failed] /var/log/app.log gen=1 fault=io: read failed directive=restart
//! [worker-restarted] /var/log/app.log gen=2 restarts=1
//! [file-error] /var/log/app.log fault=not_found: file was deleted
//! [stopped] /var/log/app.log
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a console line; `None` for events this writer ignores.
    pub fn render(e: &Event) -> Option<String> {
        let path = e.path_display();
        let fault = e
            .fault
            .as_ref()
            .map(|f| f.as_message())
            .unwrap_or_else(|| "unknown".to_string());

        let out = match e.kind {
            EventKind::LineObserved => {
                format!("{path}: {}", e.line.as_deref().unwrap_or_default())
            }
            EventKind::Initialized => format!("[initialized] {path}"),
            EventKind::FileNotFound => format!("[file-not-found] {path}"),
            EventKind::FileError => format!("[file-error] {path} fault={fault}"),
            EventKind::TailStopped => format!("[stopped] {path}"),
            EventKind::WorkerFailed => format!(
                "[worker-failed] {path} gen={} fault={fault} directive={}",
                e.generation.unwrap_or(0),
                e.directive.map(|d| d.as_label()).unwrap_or("-"),
            ),
            EventKind::WorkerRestarted => format!(
                "[worker-restarted] {path} gen={} restarts={}",
                e.generation.unwrap_or(0),
                e.restart_count.unwrap_or(0),
            ),
            EventKind::WorkerDead => format!("[worker-dead] {path} fault={fault}"),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => format!(
                "[subscriber] {}",
                e.reason.as_deref().unwrap_or("unknown")
            ),
            EventKind::ShutdownRequested => "[shutdown-requested]".to_string(),
            EventKind::AllStoppedWithin => "[all-stopped-within-grace]".to_string(),
            EventKind::GraceExceeded => "[grace-exceeded]".to_string(),
            EventKind::TailRequested
            | EventKind::TailStarted
            | EventKind::WorkerResumed => return None,
        };
        Some(out)
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if let Some(line) = Self::render(e) {
            println!("{line}");
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;

    #[test]
    fn test_lines_are_path_prefixed() {
        let ev = Event::new(EventKind::LineObserved)
            .with_path("/tmp/app.log")
            .with_line("hello world");
        assert_eq!(
            LogWriter::render(&ev).as_deref(),
            Some("/tmp/app.log: hello world")
        );
    }

    #[test]
    fn test_file_error_carries_fault() {
        let ev = Event::new(EventKind::FileError)
            .with_path("/tmp/app.log")
            .with_fault(Fault::unsupported("no seek"));
        assert_eq!(
            LogWriter::render(&ev).as_deref(),
            Some("[file-error] /tmp/app.log fault=unsupported: no seek")
        );
        assert!(LogWriter::render(&Event::new(EventKind::TailStarted)).is_none());
    }
}
