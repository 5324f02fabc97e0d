use serde::{Deserialize, Serialize};

use super::{env_parse, ConfigIssue};

/// Token-bucket rate limiting, keyed by bearer token (or client IP for
/// unauthenticated requests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// `MASC_RATE_LIMIT_ENABLED`.
    #[serde(default = "d_enabled")]
    pub enabled: bool,
    /// `MASC_RATE_LIMIT_CAPACITY` — bucket capacity (burst size).
    #[serde(default = "d_capacity")]
    pub capacity: u32,
    /// `MASC_RATE_LIMIT_REFILL` — tokens refilled per second.
    #[serde(default = "d_refill")]
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: d_capacity(),
            refill_per_sec: d_refill(),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_parse("MASC_RATE_LIMIT_ENABLED", true),
            capacity: env_parse("MASC_RATE_LIMIT_CAPACITY", d_capacity()),
            refill_per_sec: env_parse("MASC_RATE_LIMIT_REFILL", d_refill()),
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.enabled && self.capacity == 0 {
            issues.push(ConfigIssue::error(
                "limits.capacity",
                "rate limiting enabled with zero capacity rejects everything",
            ));
        }
        if self.enabled && self.refill_per_sec <= 0.0 {
            issues.push(ConfigIssue::error(
                "limits.refill_per_sec",
                "refill rate must be positive",
            ));
        }
    }
}

fn d_enabled() -> bool {
    true
}
fn d_capacity() -> u32 {
    60
}
fn d_refill() -> f64 {
    1.0
}
