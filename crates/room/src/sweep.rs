//! One combined supervisor pass over the room.
//!
//! The gateway's lifecycle supervisor calls this on every tick; tests
//! call it directly with a manual clock.

use masc_domain::trace::TraceEvent;
use masc_domain::Result;

use crate::store::RoomStore;

/// What one pass did.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct PassStats {
    pub zombied: usize,
    pub collected: usize,
    pub tasks_released: usize,
    pub locks_released: usize,
    pub capsules_created: usize,
    pub handoffs_expired: usize,
    pub handoffs_returned: usize,
    pub locks_expired: usize,
    pub cache_swept: usize,
    pub checkpoints_rejected: usize,
    pub synapses_pruned: usize,
    pub tempo: f64,
}

impl RoomStore {
    /// Run every sweep once and recalculate tempo.
    pub async fn supervisor_pass(&self) -> Result<PassStats> {
        let agents = self.sweep_agents().await?;
        let handoffs = self.sweep_handoffs().await?;
        let locks_expired = self.sweep_expired_locks().await?;
        let cache_swept = self.sweep_expired_cache().await?;
        let checkpoints_rejected = self.sweep_interrupted_checkpoints().await?;
        let synapses_pruned = self.consolidate_synapses().await?;
        let tempo = self.recalc_tempo().await?;

        let stats = PassStats {
            zombied: agents.zombied,
            collected: agents.collected,
            tasks_released: agents.tasks_released,
            locks_released: agents.locks_released,
            capsules_created: agents.capsules_created,
            handoffs_expired: handoffs.expired,
            handoffs_returned: handoffs.returned,
            locks_expired,
            cache_swept,
            checkpoints_rejected,
            synapses_pruned,
            tempo,
        };

        TraceEvent::SupervisorPass {
            zombies: stats.zombied,
            expired_handoffs: stats.handoffs_expired,
            expired_locks: stats.locks_expired,
            tempo: stats.tempo,
        }
        .emit();
        Ok(stats)
    }
}
