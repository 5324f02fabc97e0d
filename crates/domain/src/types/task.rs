use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Claimed,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Legal forward transitions.  Tasks move pending → claimed →
    /// in_progress → done monotonically; cancellation is allowed from any
    /// non-terminal state.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, Claimed) => true,
            (Claimed, InProgress) => true,
            (Claimed, Done) | (InProgress, Done) => true,
            (s, Cancelled) if !s.is_terminal() => true,
            _ => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A unit of work with an owner and a state machine.
///
/// Invariant: `claimed_by` is set exactly when `status` is claimed or
/// in_progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 1..=5, 1 is highest.
    pub priority: u8,
    pub status: TaskStatus,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<f64>,
    /// Origin marker for externally-fed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_capabilities: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, priority: u8, now: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            priority,
            status: TaskStatus::Pending,
            created_at: now,
            claimed_by: None,
            claimed_at: None,
            completed_at: None,
            source: None,
            payload: None,
            required_capabilities: Vec::new(),
        }
    }

    /// Claim-ownership invariant check.
    pub fn ownership_consistent(&self) -> bool {
        let owned = matches!(self.status, TaskStatus::Claimed | TaskStatus::InProgress);
        owned == self.claimed_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotone() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Claimed));
        assert!(Claimed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Done));
        assert!(Claimed.can_transition_to(Done));

        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Done));
        assert!(!Done.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Claimed));
    }

    #[test]
    fn cancel_from_any_non_terminal() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Claimed.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Done.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn ownership_invariant() {
        let mut task = Task::new("t1", "x", 3, 0.0);
        assert!(task.ownership_consistent());
        task.status = TaskStatus::Claimed;
        assert!(!task.ownership_consistent());
        task.claimed_by = Some("a".into());
        assert!(task.ownership_consistent());
    }
}
