//! Selection strategies over fitness-scored candidates.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Probability proportional to fitness score.
    #[default]
    Roulette,
    /// Uniform pick among the top-k by score.
    EliteTopK,
    /// Filter by capability coverage, then roulette.
    CapabilityFirst,
    /// Uniform baseline.
    Random,
}

/// An agent eligible for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub agent_id: String,
    pub score: f64,
    pub capabilities: Vec<String>,
}

impl Candidate {
    fn covers(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.capabilities.contains(r))
    }
}

const ELITE_K: usize = 3;

/// Pick one agent.  Returns `None` when no candidate qualifies.
///
/// `rng` is injected so tests drive deterministic draws.
pub fn select_agent<R: Rng>(
    strategy: SelectionStrategy,
    candidates: &[Candidate],
    required_capabilities: &[String],
    rng: &mut R,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    match strategy {
        SelectionStrategy::Random => {
            let idx = rng.gen_range(0..candidates.len());
            Some(candidates[idx].agent_id.clone())
        }
        SelectionStrategy::Roulette => roulette(candidates, rng),
        SelectionStrategy::EliteTopK => {
            let mut sorted: Vec<&Candidate> = candidates.iter().collect();
            sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            let elite = &sorted[..sorted.len().min(ELITE_K)];
            let idx = rng.gen_range(0..elite.len());
            Some(elite[idx].agent_id.clone())
        }
        SelectionStrategy::CapabilityFirst => {
            let qualified: Vec<Candidate> = candidates
                .iter()
                .filter(|c| c.covers(required_capabilities))
                .cloned()
                .collect();
            roulette(&qualified, rng)
        }
    }
}

fn roulette<R: Rng>(candidates: &[Candidate], rng: &mut R) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    // Guard against zero/NaN scores: give every candidate a small floor
    // so the wheel always has area.
    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| {
            if c.score.is_finite() {
                c.score.clamp(0.0, 1.0) + 0.01
            } else {
                0.01
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();
    let mut spin = rng.gen_range(0.0..total);
    for (candidate, weight) in candidates.iter().zip(&weights) {
        if spin < *weight {
            return Some(candidate.agent_id.clone());
        }
        spin -= weight;
    }
    candidates.last().map(|c| c.agent_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                agent_id: "low".into(),
                score: 0.1,
                capabilities: vec!["ts".into()],
            },
            Candidate {
                agent_id: "high".into(),
                score: 0.9,
                capabilities: vec!["rust".into(), "ts".into()],
            },
        ]
    }

    #[test]
    fn empty_pool_selects_nobody() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_agent(SelectionStrategy::Roulette, &[], &[], &mut rng),
            None
        );
    }

    #[test]
    fn roulette_favours_high_scores() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = candidates();
        let mut high_wins = 0;
        for _ in 0..1000 {
            if select_agent(SelectionStrategy::Roulette, &pool, &[], &mut rng).as_deref()
                == Some("high")
            {
                high_wins += 1;
            }
        }
        assert!(high_wins > 700, "high won only {high_wins}/1000");
    }

    #[test]
    fn capability_first_excludes_unqualified() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = candidates();
        let required = vec!["rust".to_string()];
        for _ in 0..50 {
            let picked =
                select_agent(SelectionStrategy::CapabilityFirst, &pool, &required, &mut rng);
            assert_eq!(picked.as_deref(), Some("high"));
        }
    }

    #[test]
    fn capability_first_can_come_up_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let required = vec!["go".to_string()];
        assert_eq!(
            select_agent(
                SelectionStrategy::CapabilityFirst,
                &candidates(),
                &required,
                &mut rng
            ),
            None
        );
    }

    #[test]
    fn zero_scores_still_select() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = vec![
            Candidate {
                agent_id: "a".into(),
                score: 0.0,
                capabilities: vec![],
            },
            Candidate {
                agent_id: "b".into(),
                score: f64::NAN,
                capabilities: vec![],
            },
        ];
        assert!(select_agent(SelectionStrategy::Roulette, &pool, &[], &mut rng).is_some());
    }
}
