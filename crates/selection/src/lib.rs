//! Agent-selection subsystems: fitness scoring, selection strategies,
//! the Hebbian collaboration graph, and the handoff drift guard.
//!
//! Everything here is a pure function over telemetry aggregates and room
//! snapshots — no I/O, no suspension points.  The Room Store feeds these
//! from its logs; the gateway exposes them as tools.

pub mod drift;
pub mod fitness;
pub mod hebbian;
pub mod strategy;

pub use drift::{classify_drift, similarity, DriftReport, DriftType};
pub use fitness::{fitness_score, AgentMetrics, FitnessBreakdown};
pub use hebbian::{consolidate, reinforce, weaken, HEBBIAN_ALPHA, PRUNE_THRESHOLD};
pub use strategy::{select_agent, Candidate, SelectionStrategy};
