//! Entity records owned by the Room Store.
//!
//! All identifiers are strings and all timestamps are seconds since the
//! Unix epoch as `f64`.  Entities reference each other by id only — a task
//! stores its claimant's agent id, never the agent record itself.

mod agent;
mod cache;
mod checkpoint;
mod handoff;
mod lock;
mod message;
mod mode;
mod portal;
mod room;
mod synapse;
mod task;
mod telemetry;
mod vote;

pub use agent::*;
pub use cache::*;
pub use checkpoint::*;
pub use handoff::*;
pub use lock::*;
pub use message::*;
pub use mode::*;
pub use portal::*;
pub use room::*;
pub use synapse::*;
pub use task::*;
pub use telemetry::*;
pub use vote::*;
