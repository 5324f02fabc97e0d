//! Per-agent fitness: a weighted sum of five normalised components over a
//! recency window.  Scores stay in [0, 1] for every finite input; an
//! agent with no recorded activity scores a neutral 0.5.

use serde::{Deserialize, Serialize};

/// Component weights.
const W_COMPLETION: f64 = 0.35;
const W_RELIABILITY: f64 = 0.25;
const W_SPEED: f64 = 0.15;
const W_HANDOFF: f64 = 0.15;
const W_COLLABORATION: f64 = 0.10;

/// Target task duration for the speed component, seconds.
const TARGET_DURATION_SECS: f64 = 60.0;

/// Collaborator count that saturates the collaboration component.
const COLLABORATOR_SATURATION: f64 = 5.0;

/// Raw aggregates for one agent over the scoring window, derived from the
/// telemetry log with exponential decay applied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub total_tasks: f64,
    pub completed_tasks: f64,
    pub error_count: f64,
    pub tool_calls: f64,
    pub avg_task_duration_secs: f64,
    pub handoffs_total: f64,
    pub handoffs_successful: f64,
    pub unique_collaborators: f64,
}

impl AgentMetrics {
    /// Whether there is any signal at all to score from.
    pub fn is_empty(&self) -> bool {
        self.total_tasks <= 0.0 && self.tool_calls <= 0.0 && self.handoffs_total <= 0.0
    }
}

/// Per-component breakdown alongside the final score.
#[derive(Debug, Clone, Serialize)]
pub struct FitnessBreakdown {
    pub completion: f64,
    pub reliability: f64,
    pub speed: f64,
    pub handoff_success: f64,
    pub collaboration: f64,
    pub score: f64,
}

/// Clamp a component to [0, 1], mapping NaN/Inf to the neutral 0.5.
fn guard(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Safe ratio: `a / b`, neutral 0.5 when there is no denominator signal.
fn ratio(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        guard(a / b)
    } else {
        0.5
    }
}

/// Compute the fitness score for one agent.
pub fn fitness_score(metrics: &AgentMetrics) -> FitnessBreakdown {
    if metrics.is_empty() {
        return FitnessBreakdown {
            completion: 0.5,
            reliability: 0.5,
            speed: 0.5,
            handoff_success: 0.5,
            collaboration: 0.5,
            score: 0.5,
        };
    }

    let completion = ratio(metrics.completed_tasks, metrics.total_tasks);

    let operations = metrics.tool_calls.max(metrics.total_tasks);
    let reliability = if operations > 0.0 {
        guard(1.0 - metrics.error_count / operations)
    } else {
        0.5
    };

    let speed = if metrics.avg_task_duration_secs > 0.0 {
        guard((TARGET_DURATION_SECS / metrics.avg_task_duration_secs).min(1.0))
    } else {
        0.5
    };

    let handoff_success = ratio(metrics.handoffs_successful, metrics.handoffs_total);

    let collaboration = guard((metrics.unique_collaborators / COLLABORATOR_SATURATION).min(1.0));

    let score = guard(
        W_COMPLETION * completion
            + W_RELIABILITY * reliability
            + W_SPEED * speed
            + W_HANDOFF * handoff_success
            + W_COLLABORATION * collaboration,
    );

    FitnessBreakdown {
        completion,
        reliability,
        speed,
        handoff_success,
        collaboration,
        score,
    }
}

/// Exponential decay factor for an event `age_secs` old, with the given
/// half-life.
pub fn decay_factor(age_secs: f64, half_life_secs: f64) -> f64 {
    if !age_secs.is_finite() || age_secs <= 0.0 || half_life_secs <= 0.0 {
        return 1.0;
    }
    0.5f64.powf(age_secs / half_life_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_metrics_is_neutral() {
        let score = fitness_score(&AgentMetrics::default());
        assert_eq!(score.score, 0.5);
    }

    #[test]
    fn perfect_agent_scores_high() {
        let metrics = AgentMetrics {
            total_tasks: 10.0,
            completed_tasks: 10.0,
            error_count: 0.0,
            tool_calls: 50.0,
            avg_task_duration_secs: 30.0,
            handoffs_total: 4.0,
            handoffs_successful: 4.0,
            unique_collaborators: 6.0,
        };
        let score = fitness_score(&metrics);
        assert!(score.score > 0.95, "score was {}", score.score);
        assert_eq!(score.speed, 1.0);
        assert_eq!(score.collaboration, 1.0);
    }

    #[test]
    fn score_bounded_for_hostile_inputs() {
        let cases = [
            AgentMetrics {
                total_tasks: f64::NAN,
                completed_tasks: f64::INFINITY,
                error_count: -5.0,
                tool_calls: f64::NEG_INFINITY,
                avg_task_duration_secs: f64::NAN,
                handoffs_total: -1.0,
                handoffs_successful: 100.0,
                unique_collaborators: f64::INFINITY,
            },
            AgentMetrics {
                total_tasks: 1.0,
                completed_tasks: 500.0,
                error_count: 1e300,
                tool_calls: 1.0,
                avg_task_duration_secs: 1e-300,
                handoffs_total: 0.0,
                handoffs_successful: 0.0,
                unique_collaborators: -3.0,
            },
        ];
        for metrics in cases {
            let score = fitness_score(&metrics).score;
            assert!((0.0..=1.0).contains(&score), "score {score} out of bounds");
        }
    }

    #[test]
    fn slow_agents_lose_speed_component() {
        let metrics = AgentMetrics {
            total_tasks: 5.0,
            completed_tasks: 5.0,
            avg_task_duration_secs: 600.0,
            ..AgentMetrics::default()
        };
        let score = fitness_score(&metrics);
        assert!((score.speed - 0.1).abs() < 1e-9);
    }

    #[test]
    fn decay_halves_at_half_life() {
        assert!((decay_factor(7.0 * 86400.0, 7.0 * 86400.0) - 0.5).abs() < 1e-9);
        assert_eq!(decay_factor(0.0, 7.0 * 86400.0), 1.0);
        assert_eq!(decay_factor(f64::NAN, 7.0 * 86400.0), 1.0);
    }
}
