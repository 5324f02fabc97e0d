use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Open,
    Closed,
}

/// A ballot box: one ballot per agent, overwrites allowed while open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub topic: String,
    pub options: Vec<String>,
    pub created_by: String,
    pub opened_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<f64>,
    pub status: VoteStatus,
    /// agent id → chosen option.
    #[serde(default)]
    pub ballots: HashMap<String, String>,
}

/// Result of tallying a vote.
#[derive(Debug, Clone, Serialize)]
pub struct VoteTally {
    pub counts: HashMap<String, usize>,
    /// Option with a strict majority of cast ballots, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub total_ballots: usize,
}

impl Vote {
    /// Tally ballots.  The winner is the option with a strict majority of
    /// cast ballots; ties and pluralities below half yield no winner.
    pub fn tally(&self) -> VoteTally {
        let mut counts: HashMap<String, usize> = self
            .options
            .iter()
            .map(|o| (o.clone(), 0usize))
            .collect();
        for option in self.ballots.values() {
            if let Some(n) = counts.get_mut(option) {
                *n += 1;
            }
        }
        let total = self.ballots.len();
        let winner = counts
            .iter()
            .find(|(_, &n)| total > 0 && n * 2 > total)
            .map(|(o, _)| o.clone());
        VoteTally {
            counts,
            winner,
            total_ballots: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote_with(ballots: &[(&str, &str)]) -> Vote {
        Vote {
            id: "v1".into(),
            topic: "merge?".into(),
            options: vec!["yes".into(), "no".into()],
            created_by: "a".into(),
            opened_at: 0.0,
            closes_at: None,
            status: VoteStatus::Open,
            ballots: ballots
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn majority_wins() {
        let tally = vote_with(&[("a", "yes"), ("b", "yes"), ("c", "no")]).tally();
        assert_eq!(tally.winner.as_deref(), Some("yes"));
        assert_eq!(tally.counts["yes"], 2);
        assert_eq!(tally.total_ballots, 3);
    }

    #[test]
    fn tie_has_no_winner() {
        let tally = vote_with(&[("a", "yes"), ("b", "no")]).tally();
        assert_eq!(tally.winner, None);
    }

    #[test]
    fn empty_vote_has_no_winner() {
        let tally = vote_with(&[]).tally();
        assert_eq!(tally.winner, None);
        assert_eq!(tally.total_ballots, 0);
    }

    #[test]
    fn ballots_for_unknown_options_are_ignored() {
        let tally = vote_with(&[("a", "maybe"), ("b", "yes"), ("c", "yes")]).tally();
        // "maybe" is not a listed option; 2 of 3 cast ballots is a majority.
        assert_eq!(tally.winner.as_deref(), Some("yes"));
    }
}
