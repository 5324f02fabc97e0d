use serde::{Deserialize, Serialize};

use super::Mode;

/// The coordination container owning agents, tasks, messages, locks,
/// votes, and portals.  Singleton per (cluster, room_id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub cluster: String,
    pub room_id: String,
    pub created_at: f64,
    #[serde(default)]
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_reason: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    /// Background-loop interval in seconds, adapted to load.
    pub tempo: f64,
}

impl Room {
    pub fn new(cluster: impl Into<String>, room_id: impl Into<String>, now: f64) -> Self {
        Self {
            cluster: cluster.into(),
            room_id: room_id.into(),
            created_at: now,
            paused: false,
            paused_reason: None,
            mode: Mode::default(),
            tempo: 30.0,
        }
    }
}
