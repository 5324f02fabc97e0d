//! Handoff drift guard.
//!
//! Compares the context a successor received against what the departing
//! agent originally recorded.  Similarity is a weighted blend of Jaccard
//! and cosine similarity over token bags; low similarity is classified so
//! callers can pick a correction strategy.  Detection never auto-approves
//! a handoff — the caller must explicitly override.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    /// Received text lost most of the original content.
    Factual,
    /// Meaning diverged: heavy growth or very low similarity.
    Semantic,
    /// Same content, different shape.
    Structural,
}

impl DriftType {
    /// Suggested correction strategy for this class of drift.
    pub fn correction(&self) -> &'static str {
        match self {
            Self::Structural => "prefer_original",
            Self::Factual => "request_clarification",
            Self::Semantic => "abstain",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub verified: bool,
    pub similarity: f64,
    pub jaccard: f64,
    pub cosine: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_type: Option<DriftType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<&'static str>,
}

fn token_bag(text: &str) -> HashMap<String, f64> {
    let mut bag = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *bag.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    bag
}

fn jaccard(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.keys().filter(|k| b.contains_key(*k)).count() as f64;
    let union = (a.len() + b.len()) as f64 - intersection;
    if union == 0.0 {
        1.0
    } else {
        intersection / union
    }
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

/// Combined similarity in [0, 1].  Symmetric, and 1 for identical inputs.
pub fn similarity(original: &str, received: &str, jaccard_w: f64, cosine_w: f64) -> f64 {
    let bag_a = token_bag(original);
    let bag_b = token_bag(received);
    let total = jaccard_w + cosine_w;
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    let j = jaccard(&bag_a, &bag_b);
    let c = cosine(&bag_a, &bag_b);
    ((jaccard_w * j + cosine_w * c) / total).clamp(0.0, 1.0)
}

/// Run the full drift check against `threshold`.
pub fn classify_drift(
    original: &str,
    received: &str,
    threshold: f64,
    jaccard_w: f64,
    cosine_w: f64,
) -> DriftReport {
    let bag_a = token_bag(original);
    let bag_b = token_bag(received);
    let j = jaccard(&bag_a, &bag_b);
    let c = cosine(&bag_a, &bag_b);
    let total = (jaccard_w + cosine_w).max(f64::MIN_POSITIVE);
    let sim = ((jaccard_w * j + cosine_w * c) / total).clamp(0.0, 1.0);

    if sim >= threshold {
        return DriftReport {
            verified: true,
            similarity: sim,
            jaccard: j,
            cosine: c,
            drift_type: None,
            correction: None,
        };
    }

    let original_len = original.chars().count().max(1) as f64;
    let received_len = received.chars().count() as f64;
    let length_ratio = received_len / original_len;

    let drift_type = if length_ratio < 0.5 {
        DriftType::Factual
    } else if length_ratio > 2.0 || sim < 0.7 {
        DriftType::Semantic
    } else {
        DriftType::Structural
    };

    DriftReport {
        verified: false,
        similarity: sim,
        jaccard: j,
        cosine: c,
        correction: Some(drift_type.correction()),
        drift_type: Some(drift_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_one() {
        let text = "Implement JWT auth with refresh tokens";
        assert_eq!(similarity(text, text, 0.5, 0.5), 1.0);
    }

    #[test]
    fn symmetric() {
        let a = "refactor the lock manager";
        let b = "the lock manager needs a refactor pass";
        let ab = similarity(a, b, 0.5, 0.5);
        let ba = similarity(b, a, 0.5, 0.5);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(similarity("alpha beta", "gamma delta", 0.5, 0.5), 0.0);
    }

    #[test]
    fn goal_swap_is_semantic_drift() {
        let report = classify_drift(
            "Implement JWT auth",
            "Implement session cookie auth",
            0.85,
            0.5,
            0.5,
        );
        assert!(!report.verified);
        assert!(report.similarity < 0.85);
        assert_eq!(report.drift_type, Some(DriftType::Semantic));
        assert_eq!(report.correction, Some("abstain"));
    }

    #[test]
    fn truncation_is_factual_drift() {
        let original = "Implement the billing pipeline: fetch invoices, reconcile \
                        against the ledger, emit corrections, and alert on mismatches";
        let report = classify_drift(original, "billing pipeline", 0.85, 0.5, 0.5);
        assert!(!report.verified);
        assert_eq!(report.drift_type, Some(DriftType::Factual));
        assert_eq!(report.correction, Some("request_clarification"));
    }

    #[test]
    fn verified_above_threshold() {
        let report = classify_drift(
            "fix the flaky retry test in backend",
            "fix the flaky retry test in the backend",
            0.85,
            0.5,
            0.5,
        );
        assert!(report.verified);
        assert_eq!(report.drift_type, None);
    }

    #[test]
    fn empty_inputs_do_not_panic() {
        let report = classify_drift("", "", 0.85, 0.5, 0.5);
        assert!(report.verified);
        assert_eq!(report.similarity, 1.0);
    }
}
