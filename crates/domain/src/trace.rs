use serde::Serialize;

/// Structured trace events emitted across all MASC crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    AgentJoined {
        agent: String,
        revived: bool,
    },
    AgentLeft {
        agent: String,
        released_tasks: usize,
        released_locks: usize,
    },
    AgentZombied {
        agent: String,
        last_heartbeat: f64,
    },
    TaskClaimed {
        task_id: String,
        agent: String,
    },
    TaskCompleted {
        task_id: String,
        agent: String,
        duration_secs: f64,
    },
    HandoffCreated {
        handoff_id: String,
        from_agent: String,
        reason: String,
    },
    HandoffClaimed {
        handoff_id: String,
        to_agent: String,
    },
    DriftDetected {
        similarity: f64,
        drift_type: String,
    },
    ToolCalled {
        tool: String,
        success: bool,
        duration_ms: u64,
    },
    SupervisorPass {
        zombies: usize,
        expired_handoffs: usize,
        expired_locks: usize,
        tempo: f64,
    },
    BackendRetry {
        operation: String,
        attempt: u32,
    },
    NotificationLag {
        subscriber: String,
        dropped: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "masc_event");
    }
}
