//! The Hebbian collaboration graph, persisted as one JSON document.

use std::collections::HashMap;

use masc_backend::keys;
use masc_domain::types::Synapse;
use masc_domain::Result;
use masc_selection::{consolidate, reinforce, weaken};

use crate::store::RoomStore;

impl RoomStore {
    /// All edges, keyed `from->to`.
    pub async fn synapses(&self) -> Result<HashMap<String, Synapse>> {
        Ok(self
            .read_json(&keys::synapse_graph(&self.room))
            .await?
            .unwrap_or_default())
    }

    /// Record the outcome of joint work between two agents.  Both
    /// directed edges are updated.
    pub async fn record_collaboration(&self, a: &str, b: &str, success: bool) -> Result<()> {
        if a == b || a.is_empty() || b.is_empty() {
            return Ok(());
        }
        let _scope = self.backend.lock("synapses").await?;
        let key = keys::synapse_graph(&self.room);
        let mut graph: HashMap<String, Synapse> =
            self.read_json(&key).await?.unwrap_or_default();

        let now = self.now();
        for (from, to) in [(a, b), (b, a)] {
            let edge = graph
                .entry(format!("{from}->{to}"))
                .or_insert_with(|| Synapse::new(from, to, now));
            if success {
                edge.weight = reinforce(edge.weight);
                edge.successes += 1;
            } else {
                edge.weight = weaken(edge.weight);
                edge.failures += 1;
            }
            edge.updated_at = now;
        }
        self.write_json(&key, &graph).await?;
        Ok(())
    }

    /// Consolidation pass: decay idle edges and prune the ones that fell
    /// below the threshold.  Returns the number pruned.
    pub(crate) async fn consolidate_synapses(&self) -> Result<usize> {
        let _scope = self.backend.lock("synapses").await?;
        let key = keys::synapse_graph(&self.room);
        let mut graph: HashMap<String, Synapse> =
            self.read_json(&key).await?.unwrap_or_default();
        if graph.is_empty() {
            return Ok(0);
        }

        let now = self.now();
        let before = graph.len();
        graph.retain(|_, edge| {
            let idle_days = ((now - edge.updated_at).max(0.0)) / 86_400.0;
            match consolidate(edge.weight, idle_days) {
                Some(weight) => {
                    edge.weight = weight;
                    // Decay is applied up to `now`; stamping the edge keeps
                    // successive passes from compounding the same idle span.
                    edge.updated_at = now;
                    true
                }
                None => false,
            }
        });
        let pruned = before - graph.len();
        self.write_json(&key, &graph).await?;
        Ok(pruned)
    }
}
