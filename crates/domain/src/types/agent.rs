use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Idle,
    Busy,
    Zombie,
    Left,
}

impl AgentStatus {
    /// Whether the agent counts as present in the room.
    pub fn is_present(self) -> bool {
        !matches!(self, Self::Left)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A client representing one LLM session, with identity, capabilities,
/// and a lifecycle in the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    pub joined_at: f64,
    pub last_heartbeat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_worktree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, capabilities: Vec<String>, now: f64) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            capabilities,
            status: AgentStatus::Active,
            joined_at: now,
            last_heartbeat: now,
            current_task_id: None,
            current_worktree: None,
            role: None,
        }
    }

    /// Whether this agent's capabilities cover every required capability.
    pub fn covers(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.capabilities.contains(r))
    }

    /// Whether the heartbeat has lapsed past `ttl` at instant `now`.
    pub fn heartbeat_lapsed(&self, now: f64, ttl: f64) -> bool {
        now - self.last_heartbeat > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_checks_subset() {
        let agent = Agent::new("a", vec!["rust".into(), "ts".into()], 0.0);
        assert!(agent.covers(&[]));
        assert!(agent.covers(&["rust".into()]));
        assert!(agent.covers(&["rust".into(), "ts".into()]));
        assert!(!agent.covers(&["go".into()]));
    }

    #[test]
    fn heartbeat_lapse() {
        let agent = Agent::new("a", vec![], 100.0);
        assert!(!agent.heartbeat_lapsed(130.0, 60.0));
        assert!(agent.heartbeat_lapsed(161.0, 60.0));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AgentStatus::Zombie).unwrap();
        assert_eq!(json, "\"zombie\"");
    }
}
