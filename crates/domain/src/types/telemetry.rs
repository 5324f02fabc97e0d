use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    AgentJoined,
    AgentLeft,
    TaskStarted,
    TaskCompleted,
    HandoffTriggered,
    Error,
    ToolCalled,
}

/// One line in the append-only telemetry log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: f64,
    pub kind: TelemetryKind,
    /// Kind-specific payload (`agent`, `task_id`, `duration_ms`, ...).
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind, timestamp: f64, fields: serde_json::Value) -> Self {
        Self {
            timestamp,
            kind,
            fields,
        }
    }

    /// The agent this event is attributed to, when present.
    pub fn agent(&self) -> Option<&str> {
        self.fields.get("agent").and_then(|v| v.as_str())
    }
}
