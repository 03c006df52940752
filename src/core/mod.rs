//! Runtime core: coordination and lifecycle.
//!
//! The public API from this module is [`Coordinator`] (plus its builder, config and
//! registry snapshot type).
//!
//! Internal modules:
//! - [`coordinator`]: handle + the loop that owns the registry and applies the restart policy;
//! - [`registry`]: path-keyed arena of worker records with generations;
//! - [`builder`]: wires bus, observers and the loop;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod coordinator;
mod registry;
mod shutdown;

pub use builder::CoordinatorBuilder;
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use registry::WorkerInfo;
