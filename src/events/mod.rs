//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the coordinator, tail workers and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator` loop, `TailWorker`, reporter and subscriber
//!   workers (overflow/panic).
//! - **Consumers**: the coordinator's bus listener (fans out to `SubscriberSet`)
//!   and any receiver obtained through `Coordinator::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
