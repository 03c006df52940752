//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] the extension point for reporting sinks and observers.
//!
//! The same trait serves two roles:
//! - **Reporter**: passed in a [`TailRequest`](crate::TailRequest); receives every event
//!   for that path (lines, missing file, errors, stop) in emission order.
//! - **Observer**: registered on the builder; receives every event on the bus.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Own queue** (observers: bounded via [`Subscribe::queue_capacity`]; reporters: unbounded)
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use tailvisor::{Event, EventKind, Subscribe};
//!
//! struct LineCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for LineCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::LineObserved) {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "line-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for reporting and observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Tolerate interleaving of events from different paths.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, not in the publisher context.
    /// Events are delivered in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs and overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity when used as a bus observer.
    ///
    /// The runtime clamps capacity to a minimum of 1. Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
