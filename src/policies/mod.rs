//! Fault classification and restart ceiling.
//!
//! ## Contents
//! - [`RestartPolicy`] classifies faults and bounds restarts per window
//! - [`Directive`] the outcome: resume / restart / stop
//! - [`RestartWindow`] per-worker sliding-window counter
//!
//! ## Quick wiring
//! ```text
//! CoordinatorConfig { restart: RestartPolicy }
//!      └─► core::coordinator uses:
//!           - policy.decide(&mut record.window, fault.kind(), now) on every worker fault
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::default()` → max_restarts=5, within=30s.

mod restart;

pub use restart::{Directive, RestartPolicy, RestartWindow};
