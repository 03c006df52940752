//! # Restart policy for tail workers.
//!
//! [`RestartPolicy`] maps a worker fault to a [`Directive`] and bounds how many
//! restarts one worker identity may consume within a sliding window.
//!
//! ## Classification
//! ```text
//! FaultKind::Arithmetic   → Resume   (cursor untouched, worker keeps going)
//! FaultKind::Unsupported  → Stop     (permanent teardown, no retry)
//! anything else           → Restart  (fresh worker, cursor at current EOF)
//! ```
//!
//! ## Ceiling
//! ```text
//! fault ──► classify ──► Restart ──► forget restarts older than `within`
//!                           │                          │
//!                           │                    record `now`
//!                           │                          │
//!                           │        recent restarts > max_restarts ─► Stop
//!                           │                          │
//!                           │                          └────────────► Restart
//!                           └── Resume / Stop pass through untouched
//! ```
//!
//! The window slides with the failures: it is anchored to the restarts themselves,
//! never to the moment a worker was spawned.
//!
//! The decision is made once per fault; there is no delay between a failure and its restart.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::FaultKind;

/// Outcome of the restart policy for one fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Keep the worker running with its state untouched.
    Resume,
    /// Replace the worker with a fresh one for the same path.
    Restart,
    /// Tear the worker down permanently.
    Stop,
}

impl Directive {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Directive::Resume => "resume",
            Directive::Restart => "restart",
            Directive::Stop => "stop",
        }
    }
}

/// Sliding-window restart state kept per worker identity.
///
/// Holds the instants of the restarts that still fall inside the policy window.
#[derive(Clone, Debug, Default)]
pub struct RestartWindow {
    restarts: VecDeque<Instant>,
}

impl RestartWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts recorded inside the window as of the last decision.
    pub fn restart_count(&self) -> u32 {
        u32::try_from(self.restarts.len()).unwrap_or(u32::MAX)
    }

    fn forget_before(&mut self, now: Instant, within: Duration) {
        while let Some(&oldest) = self.restarts.front() {
            if now.saturating_duration_since(oldest) < within {
                break;
            }
            self.restarts.pop_front();
        }
    }
}

/// Fault classification plus the restart ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Maximum restarts allowed within one window.
    pub max_restarts: u32,
    /// Length of the window.
    pub within: Duration,
}

impl Default for RestartPolicy {
    /// Returns a policy allowing 5 restarts per 30 seconds.
    fn default() -> Self {
        Self {
            max_restarts: 5,
            within: Duration::from_secs(30),
        }
    }
}

impl RestartPolicy {
    /// Maps a fault tag to a directive, ignoring the ceiling.
    ///
    /// # Example
    /// ```
    /// use tailvisor::{Directive, FaultKind, RestartPolicy};
    ///
    /// assert_eq!(RestartPolicy::classify(FaultKind::Arithmetic), Directive::Resume);
    /// assert_eq!(RestartPolicy::classify(FaultKind::Unsupported), Directive::Stop);
    /// assert_eq!(RestartPolicy::classify(FaultKind::Io), Directive::Restart);
    /// ```
    pub fn classify(kind: FaultKind) -> Directive {
        match kind {
            FaultKind::Arithmetic => Directive::Resume,
            FaultKind::Unsupported => Directive::Stop,
            _ => Directive::Restart,
        }
    }

    /// Classifies `kind` and applies the ceiling to `window`.
    ///
    /// Only `Restart` decisions consume the window. A `Restart` that would make more
    /// than `max_restarts` restarts inside any span of `within` becomes `Stop`.
    pub fn decide(&self, window: &mut RestartWindow, kind: FaultKind, now: Instant) -> Directive {
        match Self::classify(kind) {
            Directive::Restart => {
                window.forget_before(now, self.within);
                window.restarts.push_back(now);
                if window.restart_count() > self.max_restarts {
                    Directive::Stop
                } else {
                    Directive::Restart
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixth_restart_in_window_stops() {
        let policy = RestartPolicy::default();
        let start = Instant::now();
        let mut window = RestartWindow::new();

        for i in 1..=5 {
            let now = start + Duration::from_secs(i);
            assert_eq!(
                policy.decide(&mut window, FaultKind::Io, now),
                Directive::Restart,
                "fault {} should restart",
                i
            );
        }
        assert_eq!(
            policy.decide(&mut window, FaultKind::Io, start + Duration::from_secs(6)),
            Directive::Stop
        );
    }

    #[test]
    fn test_window_slides_with_failures() {
        let policy = RestartPolicy {
            max_restarts: 2,
            within: Duration::from_secs(10),
        };
        let start = Instant::now();
        let mut window = RestartWindow::new();

        assert_eq!(policy.decide(&mut window, FaultKind::Panic, start), Directive::Restart);
        let at = |s| start + Duration::from_secs(s);
        assert_eq!(policy.decide(&mut window, FaultKind::Panic, at(6)), Directive::Restart);

        // The first restart has left the window; the one at t=6 has not.
        assert_eq!(policy.decide(&mut window, FaultKind::Panic, at(11)), Directive::Restart);
        assert_eq!(window.restart_count(), 2);
        assert_eq!(policy.decide(&mut window, FaultKind::Panic, at(12)), Directive::Stop);
    }

    #[test]
    fn test_quiet_period_before_failures_does_not_reset_ceiling() {
        let policy = RestartPolicy::default();
        let spawned = Instant::now();
        let mut window = RestartWindow::new();

        let decisions: Vec<Directive> = [25, 26, 27, 28, 29, 31]
            .iter()
            .map(|s| policy.decide(&mut window, FaultKind::Io, spawned + Duration::from_secs(*s)))
            .collect();
        assert_eq!(&decisions[..5], &[Directive::Restart; 5]);
        assert_eq!(decisions[5], Directive::Stop);
    }

    #[test]
    fn test_resume_and_stop_do_not_consume_window() {
        let policy = RestartPolicy::default();
        let now = Instant::now();
        let mut window = RestartWindow::new();

        for _ in 0..10 {
            assert_eq!(
                policy.decide(&mut window, FaultKind::Arithmetic, now),
                Directive::Resume
            );
        }
        assert_eq!(
            policy.decide(&mut window, FaultKind::Unsupported, now),
            Directive::Stop
        );
        assert_eq!(window.restart_count(), 0);
    }

    #[test]
    fn test_zero_ceiling_never_restarts() {
        let policy = RestartPolicy {
            max_restarts: 0,
            within: Duration::from_secs(30),
        };
        let now = Instant::now();
        let mut window = RestartWindow::new();
        assert_eq!(policy.decide(&mut window, FaultKind::Watch, now), Directive::Stop);
    }
}
