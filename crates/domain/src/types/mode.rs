use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool categories
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Category a tool registers under.  The room's mode selects which
/// categories are visible; tools outside the active mode return
/// `tool_disabled` on invocation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Core,
    Comm,
    Portal,
    Worktree,
    Health,
    Discovery,
    Voting,
    Interrupt,
    Cost,
    Auth,
    Ratelimit,
    Encryption,
    Cellular,
    Cache,
    Run,
    Planning,
    Mitosis,
    Tempo,
    Dashboard,
    A2a,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 20] = [
        Self::Core,
        Self::Comm,
        Self::Portal,
        Self::Worktree,
        Self::Health,
        Self::Discovery,
        Self::Voting,
        Self::Interrupt,
        Self::Cost,
        Self::Auth,
        Self::Ratelimit,
        Self::Encryption,
        Self::Cellular,
        Self::Cache,
        Self::Run,
        Self::Planning,
        Self::Mitosis,
        Self::Tempo,
        Self::Dashboard,
        Self::A2a,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Comm => "comm",
            Self::Portal => "portal",
            Self::Worktree => "worktree",
            Self::Health => "health",
            Self::Discovery => "discovery",
            Self::Voting => "voting",
            Self::Interrupt => "interrupt",
            Self::Cost => "cost",
            Self::Auth => "auth",
            Self::Ratelimit => "ratelimit",
            Self::Encryption => "encryption",
            Self::Cellular => "cellular",
            Self::Cache => "cache",
            Self::Run => "run",
            Self::Planning => "planning",
            Self::Mitosis => "mitosis",
            Self::Tempo => "tempo",
            Self::Dashboard => "dashboard",
            Self::A2a => "a2a",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A filter over the tool surface, trading breadth for token economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub name: String,
    pub categories: BTreeSet<ToolCategory>,
}

impl Mode {
    /// Every category enabled.
    pub fn full() -> Self {
        Self {
            name: "full".into(),
            categories: ToolCategory::ALL.into_iter().collect(),
        }
    }

    /// Just enough to join, claim, and talk.  Discovery stays enabled so
    /// a room can always switch back out.
    pub fn minimal() -> Self {
        use ToolCategory::*;
        Self {
            name: "minimal".into(),
            categories: [Core, Comm, Health, Discovery].into_iter().collect(),
        }
    }

    /// The default working set for a shared-workspace swarm.
    pub fn coordination() -> Self {
        use ToolCategory::*;
        Self {
            name: "coordination".into(),
            categories: [
                Core, Comm, Worktree, Voting, Portal, Cellular, Interrupt, Cache, Tempo, Health,
                Discovery,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Self::full()),
            "minimal" => Some(Self::minimal()),
            "coordination" => Some(Self::coordination()),
            _ => None,
        }
    }

    pub fn enables(&self, category: ToolCategory) -> bool {
        self.categories.contains(&category)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::full()
    }
}
