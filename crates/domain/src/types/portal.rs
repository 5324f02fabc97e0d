use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default bound for each side's inbox.
pub const PORTAL_INBOX_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalMessage {
    pub from: String,
    pub payload: serde_json::Value,
    pub sent_at: f64,
}

/// A direct channel between two agents, one bounded inbox per side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portal {
    pub id: String,
    pub agent_a: String,
    pub agent_b: String,
    pub opened_at: f64,
    pub status: PortalStatus,
    #[serde(default)]
    pub inbox_a: VecDeque<PortalMessage>,
    #[serde(default)]
    pub inbox_b: VecDeque<PortalMessage>,
}

impl Portal {
    /// Whether `agent` is one of the two endpoints.
    pub fn has_member(&self, agent: &str) -> bool {
        self.agent_a == agent || self.agent_b == agent
    }

    /// The opposite endpoint, if `agent` is a member.
    pub fn peer_of(&self, agent: &str) -> Option<&str> {
        if self.agent_a == agent {
            Some(&self.agent_b)
        } else if self.agent_b == agent {
            Some(&self.agent_a)
        } else {
            None
        }
    }

    /// Enqueue a message into the receiver's inbox.  Returns `true` if the
    /// oldest entry was dropped to make room.
    pub fn push_to(&mut self, receiver: &str, msg: PortalMessage, capacity: usize) -> bool {
        let inbox = if receiver == self.agent_a {
            &mut self.inbox_a
        } else {
            &mut self.inbox_b
        };
        let overflowed = inbox.len() >= capacity;
        if overflowed {
            inbox.pop_front();
        }
        inbox.push_back(msg);
        overflowed
    }

    /// Drain and return the inbox belonging to `agent`.
    pub fn drain_inbox(&mut self, agent: &str) -> Vec<PortalMessage> {
        let inbox = if agent == self.agent_a {
            &mut self.inbox_a
        } else {
            &mut self.inbox_b
        };
        inbox.drain(..).collect()
    }
}

/// Canonical id for an (a, b) pair: order-insensitive.
pub fn portal_pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}--{b}")
    } else {
        format!("{b}--{a}")
    }
}
