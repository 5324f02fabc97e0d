//! Hebbian link maintenance for the collaboration graph.
//!
//! Successful joint work strengthens an edge, failure weakens it, and a
//! periodic consolidation pass decays and prunes.  Weights always stay in
//! [0, 1].

/// Learning rate for reinforcement and weakening.
pub const HEBBIAN_ALPHA: f64 = 0.1;

/// Edges below this weight are pruned during consolidation.
pub const PRUNE_THRESHOLD: f64 = 0.05;

/// Decay time constant, days.
pub const DECAY_TAU_DAYS: f64 = 7.0;

/// Strengthen on a successful joint task: `w ← min(1, w + α·(1 − w))`.
pub fn reinforce(weight: f64) -> f64 {
    let w = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.5 };
    (w + HEBBIAN_ALPHA * (1.0 - w)).min(1.0)
}

/// Weaken on failure: `w ← max(0, w − α·w)`.
pub fn weaken(weight: f64) -> f64 {
    let w = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.5 };
    (w - HEBBIAN_ALPHA * w).max(0.0)
}

/// Consolidation decay: `w ← w·e^(−Δdays/τ)`.  Returns `None` when the
/// decayed weight falls below the prune threshold.
pub fn consolidate(weight: f64, idle_days: f64) -> Option<f64> {
    let w = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
    let idle = if idle_days.is_finite() { idle_days.max(0.0) } else { 0.0 };
    let decayed = w * (-idle / DECAY_TAU_DAYS).exp();
    if decayed < PRUNE_THRESHOLD {
        None
    } else {
        Some(decayed)
    }
}
