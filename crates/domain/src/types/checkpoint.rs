use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Checkpoint status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pending,
    InProgress,
    Interrupted,
    Completed,
    Rejected,
    Branched,
    Reverted,
}

impl CheckpointStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Rejected | Self::Branched | Self::Reverted
        )
    }

    /// Legal transitions:
    /// Pending → InProgress → (Completed | Interrupted);
    /// Interrupted → Completed (approve) | Rejected (reject / timeout) |
    /// Branched (fork); any non-terminal → Reverted.
    pub fn can_transition_to(self, next: CheckpointStatus) -> bool {
        use CheckpointStatus::*;
        match (self, next) {
            (Pending, InProgress) => true,
            (InProgress, Completed) | (InProgress, Interrupted) => true,
            (Interrupted, Completed) | (Interrupted, Rejected) | (Interrupted, Branched) => true,
            (s, Reverted) if !s.is_terminal() => true,
            _ => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Checkpoint record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A durable workflow step supporting human-in-the-loop control:
/// interrupt, approve, reject, branch, revert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub task_id: String,
    pub step: u32,
    pub state: serde_json::Value,
    pub status: CheckpointStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_checkpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<f64>,
}

impl Checkpoint {
    /// Fork this checkpoint: the child clones the state at `step + 1` and
    /// records its parent.
    pub fn branch_child(&self, child_id: String, branch_name: String, now: f64) -> Checkpoint {
        Checkpoint {
            id: child_id,
            task_id: self.task_id.clone(),
            step: self.step + 1,
            state: self.state.clone(),
            status: CheckpointStatus::Pending,
            interrupt_message: None,
            interrupted_at: None,
            reject_reason: None,
            parent_checkpoint_id: Some(self.id.clone()),
            branch_name: Some(branch_name),
            created_at: now,
            resolved_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use CheckpointStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Interrupted));
        assert!(Interrupted.can_transition_to(Completed));
        assert!(Interrupted.can_transition_to(Rejected));
        assert!(Interrupted.can_transition_to(Branched));
        assert!(Pending.can_transition_to(Reverted));
        assert!(Interrupted.can_transition_to(Reverted));
    }

    #[test]
    fn illegal_transitions() {
        use CheckpointStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Interrupted));
        assert!(!Completed.can_transition_to(Interrupted));
        assert!(!Completed.can_transition_to(Reverted));
        assert!(!Rejected.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Branched));
    }

    #[test]
    fn branch_preserves_state_and_bumps_step() {
        let parent = Checkpoint {
            id: "c1".into(),
            task_id: "t1".into(),
            step: 3,
            state: serde_json::json!({ "cursor": 42 }),
            status: CheckpointStatus::Interrupted,
            interrupt_message: Some("review me".into()),
            interrupted_at: Some(15.0),
            reject_reason: None,
            parent_checkpoint_id: None,
            branch_name: None,
            created_at: 10.0,
            resolved_at: None,
        };
        let child = parent.branch_child("c2".into(), "alt".into(), 20.0);
        assert_eq!(child.step, 4);
        assert_eq!(child.state, parent.state);
        assert_eq!(child.parent_checkpoint_id.as_deref(), Some("c1"));
        assert_eq!(child.status, CheckpointStatus::Pending);
        assert_eq!(child.interrupt_message, None);
    }
}
