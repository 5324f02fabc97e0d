use serde::{Deserialize, Serialize};

use super::{env_parse, ConfigIssue};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lifecycle timers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Durations (seconds) driving the supervisor loops and TTL sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// `MASC_HEARTBEAT_TTL` — active agents must heartbeat within this.
    #[serde(default = "d_heartbeat_ttl")]
    pub heartbeat_ttl: f64,
    /// `MASC_ZOMBIE_TTL` — zombies are garbage-collected after this.
    #[serde(default = "d_zombie_ttl")]
    pub zombie_ttl: f64,
    /// `MASC_HANDOFF_TTL` — pending capsules expire after this.
    #[serde(default = "d_handoff_ttl")]
    pub handoff_ttl: f64,
    /// `MASC_HANDOFF_CONSUME_TTL` — claimed-but-unconsumed capsules are
    /// returned to pending after this.
    #[serde(default = "d_handoff_consume_ttl")]
    pub handoff_consume_ttl: f64,
    /// `MASC_INTERRUPT_TTL` — interrupted checkpoints auto-reject after this.
    #[serde(default = "d_interrupt_ttl")]
    pub interrupt_ttl: f64,
    /// `MASC_DRAIN_TIMEOUT` — graceful-shutdown wait for in-flight requests.
    #[serde(default = "d_drain_timeout")]
    pub drain_timeout: f64,
    /// `MASC_LOCK_TTL` — file locks expire after this; 0 disables expiry.
    #[serde(default = "d_lock_ttl")]
    pub lock_ttl: f64,
    /// `MASC_TEMPO_BASE` — base supervisor interval.
    #[serde(default = "d_tempo_base")]
    pub tempo_base: f64,
    /// `MASC_TEMPO_MIN` / `MASC_TEMPO_MAX` — clamp for the adaptive interval.
    #[serde(default = "d_tempo_min")]
    pub tempo_min: f64,
    #[serde(default = "d_tempo_max")]
    pub tempo_max: f64,
    /// `MASC_CONCURRENCY_TARGET` — active-task load normaliser for tempo.
    #[serde(default = "d_concurrency_target")]
    pub concurrency_target: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            heartbeat_ttl: d_heartbeat_ttl(),
            zombie_ttl: d_zombie_ttl(),
            handoff_ttl: d_handoff_ttl(),
            handoff_consume_ttl: d_handoff_consume_ttl(),
            interrupt_ttl: d_interrupt_ttl(),
            drain_timeout: d_drain_timeout(),
            lock_ttl: d_lock_ttl(),
            tempo_base: d_tempo_base(),
            tempo_min: d_tempo_min(),
            tempo_max: d_tempo_max(),
            concurrency_target: d_concurrency_target(),
        }
    }
}

impl LifecycleConfig {
    pub fn from_env() -> Self {
        Self {
            heartbeat_ttl: env_parse("MASC_HEARTBEAT_TTL", d_heartbeat_ttl()),
            zombie_ttl: env_parse("MASC_ZOMBIE_TTL", d_zombie_ttl()),
            handoff_ttl: env_parse("MASC_HANDOFF_TTL", d_handoff_ttl()),
            handoff_consume_ttl: env_parse("MASC_HANDOFF_CONSUME_TTL", d_handoff_consume_ttl()),
            interrupt_ttl: env_parse("MASC_INTERRUPT_TTL", d_interrupt_ttl()),
            drain_timeout: env_parse("MASC_DRAIN_TIMEOUT", d_drain_timeout()),
            lock_ttl: env_parse("MASC_LOCK_TTL", d_lock_ttl()),
            tempo_base: env_parse("MASC_TEMPO_BASE", d_tempo_base()),
            tempo_min: env_parse("MASC_TEMPO_MIN", d_tempo_min()),
            tempo_max: env_parse("MASC_TEMPO_MAX", d_tempo_max()),
            concurrency_target: env_parse("MASC_CONCURRENCY_TARGET", d_concurrency_target()),
        }
    }

    /// Adaptive supervisor interval for the given active-task count:
    /// `clamp(base * (1 + load), min, max)` with
    /// `load = active_tasks / concurrency_target`.
    pub fn tempo_for_load(&self, active_tasks: u32) -> f64 {
        let target = self.concurrency_target.max(1) as f64;
        let load_factor = active_tasks as f64 / target;
        (self.tempo_base * (1.0 + load_factor)).clamp(self.tempo_min, self.tempo_max)
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        for (name, value) in [
            ("lifecycle.heartbeat_ttl", self.heartbeat_ttl),
            ("lifecycle.zombie_ttl", self.zombie_ttl),
            ("lifecycle.handoff_ttl", self.handoff_ttl),
            ("lifecycle.interrupt_ttl", self.interrupt_ttl),
            ("lifecycle.drain_timeout", self.drain_timeout),
        ] {
            if value <= 0.0 {
                issues.push(ConfigIssue::error(name, "must be positive"));
            }
        }
        if self.tempo_min > self.tempo_max {
            issues.push(ConfigIssue::error(
                "lifecycle.tempo_min",
                "tempo_min exceeds tempo_max",
            ));
        }
    }
}

fn d_heartbeat_ttl() -> f64 {
    60.0
}
fn d_zombie_ttl() -> f64 {
    300.0
}
fn d_handoff_ttl() -> f64 {
    3600.0
}
fn d_handoff_consume_ttl() -> f64 {
    600.0
}
fn d_interrupt_ttl() -> f64 {
    900.0
}
fn d_drain_timeout() -> f64 {
    30.0
}
fn d_lock_ttl() -> f64 {
    900.0
}
fn d_tempo_base() -> f64 {
    30.0
}
fn d_tempo_min() -> f64 {
    5.0
}
fn d_tempo_max() -> f64 {
    300.0
}
fn d_concurrency_target() -> u32 {
    8
}
