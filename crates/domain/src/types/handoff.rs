use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reason & status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffReason {
    ContextLimit,
    Timeout,
    Explicit,
    FatalError,
    TaskComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    Claimed,
    Consumed,
    Expired,
}

impl HandoffStatus {
    /// Legal transitions: pending→claimed (once), claimed→consumed,
    /// any→expired, claimed→pending (supervisor return on consume
    /// timeout).  Everything else is a conflict.
    pub fn can_transition_to(self, next: HandoffStatus) -> bool {
        use HandoffStatus::*;
        match (self, next) {
            (Pending, Claimed) => true,
            (Claimed, Consumed) => true,
            (Claimed, Pending) => true,
            (Pending, Expired) | (Claimed, Expired) => true,
            _ => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capsule
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The context bundle one agent leaves behind for its successor when it
/// must yield — on context exhaustion, timeout, or explicit handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub id: String,
    pub from_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,
    pub task_id: String,
    pub reason: HandoffReason,
    /// Context window utilisation of the departing agent, 0..=100.
    pub context_pct: f64,
    pub goal: String,
    pub progress_summary: String,
    #[serde(default)]
    pub completed_steps: Vec<String>,
    #[serde(default)]
    pub pending_steps: Vec<String>,
    #[serde(default)]
    pub key_decisions: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub unresolved_errors: Vec<String>,
    #[serde(default)]
    pub modified_files: Vec<String>,
    pub created_at: f64,
    pub status: HandoffStatus,
}

impl Handoff {
    /// Render the capsule as a resume prompt for the successor agent.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Handoff from `{}`\n\n", self.from_agent));
        out.push_str(&format!("**Task:** {}\n", self.task_id));
        out.push_str(&format!("**Goal:** {}\n\n", self.goal));
        out.push_str(&format!("## Progress\n\n{}\n", self.progress_summary));

        let section = |out: &mut String, title: &str, items: &[String]| {
            if items.is_empty() {
                return;
            }
            out.push_str(&format!("\n## {title}\n\n"));
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        };
        section(&mut out, "Completed steps", &self.completed_steps);
        section(&mut out, "Pending steps", &self.pending_steps);
        section(&mut out, "Key decisions", &self.key_decisions);
        section(&mut out, "Assumptions", &self.assumptions);
        section(&mut out, "Warnings", &self.warnings);
        section(&mut out, "Unresolved errors", &self.unresolved_errors);
        section(&mut out, "Modified files", &self.modified_files);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        use HandoffStatus::*;
        assert!(Pending.can_transition_to(Claimed));
        assert!(Claimed.can_transition_to(Consumed));
        assert!(Claimed.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Expired));
        assert!(Claimed.can_transition_to(Expired));

        assert!(!Pending.can_transition_to(Consumed));
        assert!(!Consumed.can_transition_to(Claimed));
        assert!(!Expired.can_transition_to(Pending));
        assert!(!Consumed.can_transition_to(Expired));
    }

    #[test]
    fn markdown_omits_empty_sections() {
        let handoff = Handoff {
            id: "h1".into(),
            from_agent: "claude".into(),
            to_agent: None,
            task_id: "t1".into(),
            reason: HandoffReason::ContextLimit,
            context_pct: 92.0,
            goal: "Ship the parser".into(),
            progress_summary: "Lexer done".into(),
            completed_steps: vec!["lexer".into()],
            pending_steps: vec![],
            key_decisions: vec![],
            assumptions: vec![],
            warnings: vec![],
            unresolved_errors: vec![],
            modified_files: vec![],
            created_at: 0.0,
            status: HandoffStatus::Pending,
        };
        let md = handoff.render_markdown();
        assert!(md.contains("# Handoff from `claude`"));
        assert!(md.contains("- lexer"));
        assert!(!md.contains("Pending steps"));
        assert!(!md.contains("Warnings"));
    }
}
