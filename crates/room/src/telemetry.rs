//! Append-only telemetry log plus the derived per-agent aggregates that
//! feed fitness scoring and the credits ledger.
//!
//! Telemetry is best-effort: a failed append is logged and swallowed so
//! bookkeeping never fails a user-visible operation.

use std::collections::{HashMap, HashSet};

use masc_backend::{keys, SharedBackend};
use masc_domain::clock::SharedClock;
use masc_domain::types::{TelemetryEvent, TelemetryKind};
use masc_selection::fitness::decay_factor;
use masc_selection::AgentMetrics;

/// Recency window for fitness aggregation, seconds (7 days).
pub const FITNESS_WINDOW_SECS: f64 = 7.0 * 86_400.0;

/// Exponential-decay half-life for fitness aggregation, seconds (7 days).
pub const FITNESS_HALF_LIFE_SECS: f64 = 7.0 * 86_400.0;

#[derive(Clone)]
pub struct TelemetryLog {
    backend: SharedBackend,
    clock: SharedClock,
    room: String,
}

impl TelemetryLog {
    pub fn new(backend: SharedBackend, clock: SharedClock, room: String) -> Self {
        Self {
            backend,
            clock,
            room,
        }
    }

    /// Append one event.  Failures are logged, never propagated.
    pub async fn record(&self, kind: TelemetryKind, fields: serde_json::Value) {
        let event = TelemetryEvent::new(kind, self.clock.now(), fields);
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "unserialisable telemetry event");
                return;
            }
        };
        let key = keys::telemetry_log(&self.room);
        if let Err(e) = self.backend.append(&key, &line).await {
            tracing::warn!(error = %e, "telemetry append failed");
        }
    }

    /// All events with `timestamp >= cutoff`, oldest first.
    pub async fn events_since(&self, cutoff: f64) -> Vec<TelemetryEvent> {
        let key = keys::telemetry_log(&self.room);
        let lines = match self.backend.read_log(&key, 0, 0).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(error = %e, "telemetry read failed");
                return Vec::new();
            }
        };
        lines
            .iter()
            .filter_map(|line| serde_json::from_str::<TelemetryEvent>(line).ok())
            .filter(|e| e.timestamp >= cutoff)
            .collect()
    }

    /// Move today's log aside under a dated archive key.
    pub async fn rotate(&self, date: &str) -> masc_domain::Result<()> {
        let src = keys::telemetry_log(&self.room);
        let dst = keys::telemetry_archive(&self.room, date);
        self.backend.rotate_log(&src, &dst).await
    }

    // ── Aggregates ──────────────────────────────────────────────────

    /// Decayed per-agent aggregates over the fitness window.
    pub async fn agent_metrics(&self) -> HashMap<String, AgentMetrics> {
        let now = self.clock.now();
        let events = self.events_since(now - FITNESS_WINDOW_SECS).await;

        let mut metrics: HashMap<String, AgentMetrics> = HashMap::new();
        let mut durations: HashMap<String, Vec<(f64, f64)>> = HashMap::new();
        let mut collaborators: HashMap<String, HashSet<String>> = HashMap::new();

        for event in &events {
            let Some(agent) = event.agent().map(str::to_owned) else {
                continue;
            };
            let weight = decay_factor(now - event.timestamp, FITNESS_HALF_LIFE_SECS);
            let entry = metrics.entry(agent.clone()).or_default();

            match event.kind {
                TelemetryKind::TaskStarted => entry.total_tasks += weight,
                TelemetryKind::TaskCompleted => {
                    entry.completed_tasks += weight;
                    if let Some(duration) = event
                        .fields
                        .get("duration_secs")
                        .and_then(|v| v.as_f64())
                        .filter(|d| d.is_finite() && *d >= 0.0)
                    {
                        durations.entry(agent.clone()).or_default().push((duration, weight));
                    }
                }
                TelemetryKind::Error => entry.error_count += weight,
                TelemetryKind::ToolCalled => entry.tool_calls += weight,
                TelemetryKind::HandoffTriggered => {
                    let outcome = event
                        .fields
                        .get("outcome")
                        .and_then(|v| v.as_str())
                        .unwrap_or("created");
                    match outcome {
                        "created" => entry.handoffs_total += weight,
                        "completed" => {
                            entry.handoffs_successful += weight;
                            if let Some(peer) =
                                event.fields.get("to_agent").and_then(|v| v.as_str())
                            {
                                collaborators
                                    .entry(agent.clone())
                                    .or_default()
                                    .insert(peer.to_owned());
                                collaborators
                                    .entry(peer.to_owned())
                                    .or_default()
                                    .insert(agent.clone());
                            }
                        }
                        _ => {}
                    }
                }
                TelemetryKind::AgentJoined | TelemetryKind::AgentLeft => {}
            }
        }

        for (agent, samples) in durations {
            let total_weight: f64 = samples.iter().map(|(_, w)| w).sum();
            if total_weight > 0.0 {
                let weighted: f64 = samples.iter().map(|(d, w)| d * w).sum();
                if let Some(entry) = metrics.get_mut(&agent) {
                    entry.avg_task_duration_secs = weighted / total_weight;
                }
            }
        }
        for (agent, peers) in collaborators {
            metrics.entry(agent).or_default().unique_collaborators = peers.len() as f64;
        }

        metrics
    }

    /// Undecayed lifetime counters for the credits ledger.
    pub async fn credit_counters(&self) -> HashMap<String, CreditEntry> {
        let events = self.events_since(0.0).await;
        let mut credits: HashMap<String, CreditEntry> = HashMap::new();
        for event in &events {
            let Some(agent) = event.agent() else { continue };
            let entry = credits.entry(agent.to_owned()).or_default();
            match event.kind {
                TelemetryKind::TaskCompleted => entry.tasks_completed += 1,
                TelemetryKind::ToolCalled => entry.tool_calls += 1,
                TelemetryKind::Error => entry.errors += 1,
                TelemetryKind::HandoffTriggered => {
                    if event.fields.get("outcome").and_then(|v| v.as_str()) == Some("completed") {
                        entry.handoffs_completed += 1;
                    }
                }
                _ => {}
            }
        }
        credits
    }
}

/// Lifetime counters surfaced at `/api/v1/credits`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CreditEntry {
    pub tasks_completed: u64,
    pub tool_calls: u64,
    pub errors: u64,
    pub handoffs_completed: u64,
}
