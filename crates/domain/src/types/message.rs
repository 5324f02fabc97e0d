use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Broadcast,
    System,
    TaskUpdate,
    AgentEvent,
    HandoffEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
}

/// One entry in the room's append-only message log.
///
/// `seq` is strictly increasing per room and continues above the max
/// persisted value after restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub seq: u64,
    pub timestamp: f64,
    pub sender: String,
    pub kind: MessageKind,
    pub body: serde_json::Value,
    #[serde(default)]
    pub priority: MessagePriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageKind::TaskUpdate).unwrap(),
            "\"task_update\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::HandoffEvent).unwrap(),
            "\"handoff_event\""
        );
    }

    #[test]
    fn priority_defaults_to_normal() {
        let msg: Message = serde_json::from_str(
            r#"{"seq":1,"timestamp":0.0,"sender":"a","kind":"broadcast","body":{}}"#,
        )
        .unwrap();
        assert_eq!(msg.priority, MessagePriority::Normal);
    }
}
