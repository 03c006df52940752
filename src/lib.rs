//! # tailvisor
//!
//! **Tailvisor** tails text files and streams newly appended lines to a reporter,
//! under a coordinator that isolates and classifies worker faults.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │ TailRequest  │   │ StopRequest  │
//!     │(path+reporter│   │   (path)     │
//!     └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (single loop task)                                   │
//! │  - Registry (path → WorkerRecord{generation, window, handles})    │
//! │  - RestartPolicy (classify + 5 restarts / 30s ceiling)            │
//! │  - Bus (broadcast events to observers)                            │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼        ▲
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TailWorker  │   │  TailWorker  │   │  TailWorker  │  WorkerSignal
//!     │  (a.log, g1) │   │  (b.log, g3) │   │  (c.log, g1) │  (fault, panic,
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   finished)
//!      │ LineObserved     │                  │
//!      ▼                  ▼                  ▼
//!   ReportQueue        ReportQueue        ReportQueue   ──► reporter.on_event()
//!      └──────────────────┴──────────────────┴──► Bus ──► SubscriberSet ──► observers
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! Starting ──► Watching ⇄ Reading ──► Stopped | Failed | Replaced | Finished
//!
//! fault in any step ──► coordinator: classify(fault.kind)
//!     ├─ Arithmetic  ─► Resume  (cursor kept)
//!     ├─ Unsupported ─► Stop    (FileError to reporter)
//!     └─ otherwise   ─► Restart (new generation, cursor at EOF)
//!                       └─ more than 5 in 30s ─► Stop
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                        |
//! |-------------------|------------------------------------------------------------------|-------------------------------------------|
//! | **Coordination**  | Start/stop tailing, snapshot, shutdown.                          | [`Coordinator`], [`CoordinatorConfig`]    |
//! | **Requests**      | What to tail and who hears about it.                             | [`TailRequest`], [`StopRequest`]          |
//! | **Policies**      | Fault classification and restart ceiling.                        | [`RestartPolicy`], [`Directive`]          |
//! | **Events**        | Lines, file state, coordinator decisions.                        | [`Event`], [`EventKind`]                  |
//! | **Subscribers**   | Reporters and observers.                                         | [`Subscribe`], [`SubscriberSet`]          |
//! | **Errors**        | Tagged worker faults and runtime errors.                         | [`Fault`], [`FaultKind`], [`RuntimeError`]|
//!
//! ## Optional features
//! - `logging`: exports the console reporter [`LogWriter`] and builds the `wintail` binary.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tailvisor::{Coordinator, CoordinatorConfig, Event, EventKind, Subscribe, TailRequest};
//!
//! struct Lines;
//!
//! #[async_trait]
//! impl Subscribe for Lines {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::LineObserved {
//!             println!("{}", ev.line.as_deref().unwrap_or_default());
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
//!     coordinator.begin_tail(TailRequest::new("/var/log/app.log", Arc::new(Lines)))?;
//!     coordinator.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tail;

// ---- Public re-exports ----

pub use core::{Coordinator, CoordinatorBuilder, CoordinatorConfig, WorkerInfo};
pub use error::{Fault, FaultKind, RuntimeError};
pub use events::{Event, EventKind};
pub use policies::{Directive, RestartPolicy, RestartWindow};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tail::{StopRequest, TailRequest};

// Optional: console reporter.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
