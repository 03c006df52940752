//! # Event subscribers for the tailvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the fan-out machinery that feeds it,
//! and the built-in console reporter.
//!
//! ## Architecture
//! ```text
//! TailWorker ── ReportQueue::send(Event) ──► reporter.on_event()   (per request, FIFO)
//!                        │
//!                        └──► Bus ──► bus listener ──► SubscriberSet ──► observers
//! ```
//!
//! ## Subscriber types
//! - **Reporters** - one per tail request, see every event of their path in order
//! - **Observers** - registered once, see every event on the bus (logging, metrics)

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub(crate) use subscriber_set::{ReportQueue, panic_message};
pub use subscriber_set::SubscriberSet;
