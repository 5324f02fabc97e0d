//! Handoff capsules — "cellular division" between agents.
//!
//! A departing agent persists a capsule; a successor claims it (CAS, one
//! winner), consumes it, and acks completion.  Capsules are a sealed
//! family: with encryption enabled they are stored as AES-GCM envelopes.

use masc_backend::keys;
use masc_domain::trace::TraceEvent;
use masc_domain::types::{Handoff, HandoffStatus, TelemetryKind};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

/// Outcome of the supervisor's handoff sweep.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct HandoffSweepStats {
    pub expired: usize,
    pub returned: usize,
}

impl RoomStore {
    /// Persist a new capsule.  The id and timestamps are assigned here.
    pub async fn handoff_create(&self, mut capsule: Handoff) -> Result<Handoff> {
        if capsule.goal.is_empty() {
            return Err(Error::InvalidArgument("goal must not be empty".into()));
        }
        if !(0.0..=100.0).contains(&capsule.context_pct) {
            return Err(Error::InvalidArgument(
                "context_pct must be within 0..=100".into(),
            ));
        }
        self.require_agent(&capsule.from_agent).await?;
        if self.get_task(&capsule.task_id).await?.is_none() {
            return Err(Error::NotFound(format!("task {}", capsule.task_id)));
        }

        capsule.id = uuid::Uuid::new_v4().to_string();
        capsule.created_at = self.now();
        capsule.status = HandoffStatus::Pending;
        capsule.to_agent = None;

        self.write_sealed(&keys::handoff(&self.room, &capsule.id), &capsule)
            .await?;

        TraceEvent::HandoffCreated {
            handoff_id: capsule.id.clone(),
            from_agent: capsule.from_agent.clone(),
            reason: serde_json::to_value(capsule.reason)?
                .as_str()
                .unwrap_or("explicit")
                .to_owned(),
        }
        .emit();
        self.telemetry
            .record(
                TelemetryKind::HandoffTriggered,
                serde_json::json!({
                    "agent": capsule.from_agent,
                    "handoff_id": capsule.id,
                    "outcome": "created",
                }),
            )
            .await;
        self.notify(
            "handoff_created",
            serde_json::json!({
                "handoff_id": capsule.id,
                "from_agent": capsule.from_agent,
                "task_id": capsule.task_id,
            }),
        );
        Ok(capsule)
    }

    /// Claim a pending capsule.  Exactly one of any set of concurrent
    /// claimants wins; the rest see a conflict.
    pub async fn handoff_claim(&self, handoff_id: &str, agent_id: &str) -> Result<Handoff> {
        self.require_agent(agent_id).await?;
        let key = keys::handoff(&self.room, handoff_id);

        let raw = self
            .read_raw(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("handoff {handoff_id}")))?;
        let plain = self.encryptor.open(&raw)?;
        let capsule: Handoff = serde_json::from_str(&plain)
            .map_err(|e| Error::Internal(format!("corrupt handoff {handoff_id}: {e}")))?;

        match capsule.status {
            HandoffStatus::Pending => {}
            HandoffStatus::Expired => {
                return Err(Error::NotFound(format!("handoff {handoff_id} expired")));
            }
            _ => {
                return Err(Error::Conflict(format!(
                    "handoff {handoff_id} already claimed"
                )));
            }
        }

        let mut claimed = capsule;
        claimed.status = HandoffStatus::Claimed;
        claimed.to_agent = Some(agent_id.to_owned());

        if !self.cas_sealed(&key, Some(&raw), &claimed).await? {
            return Err(Error::Conflict(format!(
                "handoff {handoff_id} claim lost to another agent"
            )));
        }

        TraceEvent::HandoffClaimed {
            handoff_id: handoff_id.to_owned(),
            to_agent: agent_id.to_owned(),
        }
        .emit();
        self.notify(
            "handoff_claimed",
            serde_json::json!({ "handoff_id": handoff_id, "to_agent": agent_id }),
        );
        Ok(claimed)
    }

    /// Fetch a capsule with its rendered resume prompt.
    pub async fn handoff_get(&self, handoff_id: &str) -> Result<(Handoff, String)> {
        let capsule: Handoff = self
            .read_sealed(&keys::handoff(&self.room, handoff_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("handoff {handoff_id}")))?;
        let prompt = capsule.render_markdown();
        Ok((capsule, prompt))
    }

    /// The successor's explicit ack: claimed → consumed.  This is the only
    /// signal that counts a handoff as successful.
    pub async fn handoff_complete(&self, handoff_id: &str, agent_id: &str) -> Result<Handoff> {
        let _scope = self.backend.lock(&format!("handoff:{handoff_id}")).await?;
        let key = keys::handoff(&self.room, handoff_id);
        let mut capsule: Handoff = self
            .read_sealed(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("handoff {handoff_id}")))?;

        if capsule.to_agent.as_deref() != Some(agent_id) {
            return Err(Error::Forbidden(format!(
                "handoff {handoff_id} is not claimed by {agent_id}"
            )));
        }
        if !capsule.status.can_transition_to(HandoffStatus::Consumed) {
            return Err(Error::Conflict(format!(
                "handoff {handoff_id} cannot be consumed from its current state"
            )));
        }
        capsule.status = HandoffStatus::Consumed;
        self.write_sealed(&key, &capsule).await?;

        // A consumed handoff is successful joint work: strengthen the
        // edge between the two agents.
        self.record_collaboration(&capsule.from_agent, agent_id, true)
            .await?;

        self.telemetry
            .record(
                TelemetryKind::HandoffTriggered,
                serde_json::json!({
                    "agent": capsule.from_agent,
                    "handoff_id": handoff_id,
                    "outcome": "completed",
                    "to_agent": agent_id,
                }),
            )
            .await;
        self.notify(
            "handoff_consumed",
            serde_json::json!({ "handoff_id": handoff_id, "to_agent": agent_id }),
        );
        Ok(capsule)
    }

    /// List capsules, optionally filtered by status.
    pub async fn handoffs(&self, status: Option<HandoffStatus>) -> Result<Vec<Handoff>> {
        let mut capsules = Vec::new();
        for key in self.list_keys(&keys::handoffs_prefix(&self.room)).await? {
            let Some(capsule) = self.read_sealed::<Handoff>(&key).await? else {
                continue;
            };
            if status.map_or(true, |s| capsule.status == s) {
                capsules.push(capsule);
            }
        }
        capsules.sort_by(|a, b| {
            b.created_at
                .partial_cmp(&a.created_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(capsules)
    }

    /// Supervisor sweep: expire stale pending capsules; return claimed but
    /// unconsumed ones to the pool.
    pub(crate) async fn sweep_handoffs(&self) -> Result<HandoffSweepStats> {
        let now = self.now();
        let mut stats = HandoffSweepStats::default();
        for key in self.list_keys(&keys::handoffs_prefix(&self.room)).await? {
            let Some(candidate) = self.read_sealed::<Handoff>(&key).await? else {
                continue;
            };
            // Re-read under the capsule's scope lock: a claim or a
            // completion may have raced the unlocked scan above.
            let _scope = self.backend.lock(&format!("handoff:{}", candidate.id)).await?;
            let Some(mut capsule) = self.read_sealed::<Handoff>(&key).await? else {
                continue;
            };
            match capsule.status {
                HandoffStatus::Pending if now - capsule.created_at > self.lifecycle.handoff_ttl => {
                    capsule.status = HandoffStatus::Expired;
                    self.write_sealed(&key, &capsule).await?;
                    stats.expired += 1;
                    self.notify(
                        "handoff_expired",
                        serde_json::json!({ "handoff_id": capsule.id }),
                    );
                }
                HandoffStatus::Claimed
                    if now - capsule.created_at > self.lifecycle.handoff_consume_ttl =>
                {
                    let abandoned_by = capsule.to_agent.take();
                    capsule.status = HandoffStatus::Pending;
                    self.write_sealed(&key, &capsule).await?;
                    if let Some(successor) = abandoned_by {
                        // The successor sat on the capsule: weaken the edge.
                        self.record_collaboration(&capsule.from_agent, &successor, false)
                            .await?;
                    }
                    stats.returned += 1;
                    self.notify(
                        "handoff_returned",
                        serde_json::json!({ "handoff_id": capsule.id }),
                    );
                }
                _ => {}
            }
        }
        Ok(stats)
    }
}
