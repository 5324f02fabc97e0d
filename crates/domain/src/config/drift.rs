use serde::{Deserialize, Serialize};

use super::{env_parse, ConfigIssue};

/// Tuning for the handoff drift guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// `MASC_DRIFT_THRESHOLD` — combined similarity below this flags drift.
    #[serde(default = "d_threshold")]
    pub threshold: f64,
    /// `MASC_DRIFT_JACCARD_WEIGHT`.
    #[serde(default = "d_half")]
    pub jaccard_weight: f64,
    /// `MASC_DRIFT_COSINE_WEIGHT`.
    #[serde(default = "d_half")]
    pub cosine_weight: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: d_threshold(),
            jaccard_weight: d_half(),
            cosine_weight: d_half(),
        }
    }
}

impl DriftConfig {
    pub fn from_env() -> Self {
        Self {
            threshold: env_parse("MASC_DRIFT_THRESHOLD", d_threshold()),
            jaccard_weight: env_parse("MASC_DRIFT_JACCARD_WEIGHT", d_half()),
            cosine_weight: env_parse("MASC_DRIFT_COSINE_WEIGHT", d_half()),
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if !(0.0..=1.0).contains(&self.threshold) {
            issues.push(ConfigIssue::error(
                "drift.threshold",
                "threshold must be within [0, 1]",
            ));
        }
        let sum = self.jaccard_weight + self.cosine_weight;
        if sum <= 0.0 {
            issues.push(ConfigIssue::error(
                "drift.weights",
                "similarity weights must sum to a positive value",
            ));
        }
    }
}

fn d_threshold() -> f64 {
    0.85
}
fn d_half() -> f64 {
    0.5
}
