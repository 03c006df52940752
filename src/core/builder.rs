use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    config::CoordinatorConfig,
    coordinator::{Coordinator, CoordinatorLoop},
};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Coordinator`].
pub struct CoordinatorBuilder {
    cfg: CoordinatorConfig,
    observers: Vec<Arc<dyn Subscribe>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: CoordinatorConfig) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
        }
    }

    /// Sets observers that receive every event on the bus.
    ///
    /// Observers are independent of the per-request reporters; use them for logging
    /// or metrics across all tailed files.
    pub fn with_subscribers(mut self, observers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the coordinator and spawns its loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Coordinator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        let subs = SubscriberSet::new(self.observers, bus.clone());
        if !subs.is_empty() {
            spawn_bus_listener(&bus, subs, runtime_token.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let looped = CoordinatorLoop::new(self.cfg, bus.clone(), rx, runtime_token);
        tokio::spawn(looped.run());

        Coordinator::new(tx, bus)
    }
}

/// Forwards bus events to observers until the runtime token is cancelled.
fn spawn_bus_listener(bus: &Bus, subs: SubscriberSet, runtime_token: CancellationToken) {
    let mut rx = bus.subscribe();
    let bus = bus.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = runtime_token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "bus listener lagged");
                        bus.publish(
                            crate::events::Event::new(crate::events::EventKind::SubscriberOverflow)
                                .with_reason(format!("bus_listener_lagged skipped={n}")),
                        );
                    }
                }
            }
        }
        // Deliver what is already queued to observers before exiting.
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    });
}
