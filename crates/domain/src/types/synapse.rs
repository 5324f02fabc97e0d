use serde::{Deserialize, Serialize};

/// A directed edge in the agent collaboration graph.
///
/// Weight stays in `[0, 1]`; reinforcement and decay are applied by the
/// Hebbian subsystem in `masc-selection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synapse {
    pub from: String,
    pub to: String,
    pub weight: f64,
    pub successes: u64,
    pub failures: u64,
    pub updated_at: f64,
}

impl Synapse {
    pub fn new(from: impl Into<String>, to: impl Into<String>, now: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight: 0.5,
            successes: 0,
            failures: 0,
            updated_at: now,
        }
    }

    /// Storage key for this edge within the graph document.
    pub fn edge_key(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }
}
