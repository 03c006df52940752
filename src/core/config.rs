//! # Coordinator configuration.
//!
//! Provides [`CoordinatorConfig`] centralized settings for the tailing runtime.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `poll_interval = 0s` → clamped to 1ms

use std::time::Duration;

use crate::policies::RestartPolicy;

/// Global configuration for the coordinator runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for workers to release their files on shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `poll_interval`: Fallback re-check period when no change notification arrives
/// - `restart`: Fault classification ceiling shared by all workers
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Maximum time to wait for graceful shutdown before aborting workers.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Observers that lag behind more than `bus_capacity` messages skip older items.
    /// Reporters are unaffected (they have their own queue).
    pub bus_capacity: usize,

    /// How often a watching worker re-checks its file without a notification.
    pub poll_interval: Duration,

    /// Restart ceiling applied per worker identity.
    pub restart: RestartPolicy,
}

impl CoordinatorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }
}

impl Default for CoordinatorConfig {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `poll_interval = 1s`
    /// - `restart = RestartPolicy::default()` (5 restarts per 30s)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            poll_interval: Duration::from_secs(1),
            restart: RestartPolicy::default(),
        }
    }
}
