//! # Tail workers and their inputs.
//!
//! - [`TailRequest`] / [`StopRequest`] - what callers hand to the coordinator
//! - `TailWorker` - per-file state machine (open, watch, read, resume)
//! - `TailCursor` - read position with partial-line holdback and truncation reset
//! - `ChangeFeed` - `notify` subscription plus poll fallback

mod cursor;
mod request;
mod watch;
mod worker;

pub use request::{StopRequest, TailRequest};
pub(crate) use worker::{TailWorker, WorkerParams, WorkerSignal};
