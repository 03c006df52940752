//! # Non-blocking event fan-out to subscribers.
//!
//! Provides [`SubscriberSet`] for bus observers and [`ReportQueue`] for the
//! reporter attached to a single tail request.
//!
//! ## Architecture
//! ```text
//! SubscriberSet::emit(event)
//!     ├──► [bounded queue 1] ──► worker 1 ──► observer1.on_event()
//!     └──► [bounded queue N] ──► worker N ──► observerN.on_event()
//!
//! ReportQueue::send(event)   (one per TailRequest, shared by all worker generations)
//!     └──► [unbounded queue] ──► worker ──► reporter.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()`/`send()` return immediately
//! - **Observer overflow**: event dropped for that observer only, `SubscriberOverflow` published
//! - **Reporter queue** is unbounded: a slow reporter never loses a line
//! - **Isolation**: slow/panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in send order
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind`: a panic becomes a `SubscriberPanicked`
//! event and the worker continues with the next event.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Runs one `on_event` call, turning a panic into `SubscriberPanicked` on the bus.
async fn deliver(sub: &Arc<dyn Subscribe>, ev: &Event, bus: &Bus) {
    let fut = sub.on_event(ev);
    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        let info = panic_message(&*panic_err);
        tracing::warn!(subscriber = sub.name(), info = %info, "subscriber panicked");
        bus.publish(Event::subscriber_panicked(sub.name(), info));
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for bus observers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Minimum queue capacity is 1 (enforced).
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    deliver(&sub, ev.as_ref(), &bus_for_worker).await;
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Returns true if no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all observers (clones the event once).
    pub fn emit(&self, event: &Event) {
        if self.channels.is_empty() {
            return;
        }
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all observers.
    ///
    /// `SubscriberOverflow` events are not re-published if they themselves overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_overflow_evt {
                        self.bus
                            .publish(Event::subscriber_overflow(channel.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_overflow_evt {
                        self.bus
                            .publish(Event::subscriber_overflow(channel.name, "closed"));
                    }
                }
            }
        }
    }

    /// Gracefully shuts down all observer workers.
    ///
    /// Drops all senders, then awaits the workers (they drain their queues first).
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// FIFO delivery queue in front of a single reporter.
///
/// Cloned into every worker generation of one tail request, so events from a
/// restarted worker queue up behind those of its predecessor.
#[derive(Clone)]
pub(crate) struct ReportQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<Arc<Event>>,
    bus: Bus,
}

impl ReportQueue {
    /// Spawns the delivery worker for `reporter`.
    pub(crate) fn spawn(reporter: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let name = reporter.name();
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Event>>();
        let bus_for_worker = bus.clone();

        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                deliver(&reporter, ev.as_ref(), &bus_for_worker).await;
            }
        });
        Self { name, tx, bus }
    }

    /// Queues `event` for the reporter and mirrors it onto the bus.
    pub(crate) fn send(&self, event: Event) {
        let event = Arc::new(event);
        if self.tx.send(Arc::clone(&event)).is_err() {
            self.bus
                .publish(Event::subscriber_overflow(self.name, "closed"));
        }
        self.bus.publish((*event).clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct Collect(Mutex<Vec<u64>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().await.push(ev.seq);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Boom;

    #[async_trait]
    impl Subscribe for Boom {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "boom"
        }
    }

    #[tokio::test]
    async fn test_report_queue_preserves_order() {
        let bus = Bus::new(16);
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        let queue = ReportQueue::spawn(collect.clone(), bus);

        let mut sent = Vec::new();
        for _ in 0..50 {
            let ev = Event::new(EventKind::LineObserved);
            sent.push(ev.seq);
            queue.send(ev);
        }

        tokio::time::timeout(Duration::from_secs(2), async {
            while collect.0.lock().await.len() < 50 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*collect.0.lock().await, sent);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Boom) as Arc<dyn Subscribe>], bus.clone());

        set.emit(&Event::new(EventKind::TailRequested));

        let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(ev.reason.as_deref().unwrap().contains("boom"));
        set.shutdown().await;
    }
}
