//! The Room Store — sole owner of the canonical coordination state.
//!
//! Every mutating operation follows the same shape: validate arguments,
//! acquire the minimum backend scope lock, read, compute the new state
//! while checking invariants, write through the backend (CAS where a
//! cross-process race is possible), then publish notifications with a
//! monotone sequence number.  Consumers only ever receive value
//! snapshots; nothing hands out references into the store.

pub mod bus;
mod store;
mod telemetry;

mod agents;
mod cache;
mod checkpoints;
mod handoffs;
mod locks;
mod messages;
mod meta;
mod portals;
mod sweep;
mod synapses;
mod tasks;
mod votes;

pub use agents::SweepStats;
pub use bus::{Notification, NotificationBus, ReplayOutcome, Subscription};
pub use store::{RoomStatus, RoomStore};
pub use sweep::PassStats;
pub use telemetry::{CreditEntry, TelemetryLog};
