//! Room metadata: pause, mode, tempo, and the status snapshot.

use std::collections::HashMap;

use masc_backend::keys;
use masc_domain::types::{HandoffStatus, Mode, Room};
use masc_domain::{Error, Result};

use crate::store::{RoomStatus, RoomStore};

impl RoomStore {
    pub async fn room_meta(&self) -> Result<Room> {
        self.read_json(&keys::room_meta(&self.room))
            .await?
            .ok_or_else(|| Error::Internal(format!("room {} record missing", self.room)))
    }

    async fn update_meta(&self, mutate: impl Fn(&mut Room)) -> Result<Room> {
        let _scope = self.backend.lock("room_meta").await?;
        let key = keys::room_meta(&self.room);
        let mut meta: Room = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::Internal(format!("room {} record missing", self.room)))?;
        mutate(&mut meta);
        self.write_json(&key, &meta).await?;
        Ok(meta)
    }

    pub async fn pause(&self, reason: Option<String>) -> Result<Room> {
        let meta = self
            .update_meta(|m| {
                m.paused = true;
                m.paused_reason = reason.clone();
            })
            .await?;
        self.notify("room_paused", serde_json::json!({ "reason": meta.paused_reason }));
        Ok(meta)
    }

    pub async fn resume(&self) -> Result<Room> {
        let meta = self
            .update_meta(|m| {
                m.paused = false;
                m.paused_reason = None;
            })
            .await?;
        self.notify("room_resumed", serde_json::json!({}));
        Ok(meta)
    }

    // ── Mode ────────────────────────────────────────────────────────

    /// Current tool-surface mode.
    pub async fn mode(&self) -> Result<Mode> {
        // The mode lives in its own config document so external tooling
        // can inspect `.masc/rooms/{room}/config.json` directly.
        let key = format!("rooms/{}/config.json", self.room);
        Ok(self
            .read_json::<Mode>(&key)
            .await?
            .unwrap_or_default())
    }

    /// Switch the room's mode by preset name.
    pub async fn set_mode(&self, preset: &str) -> Result<Mode> {
        let mode = Mode::preset(preset)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown mode {preset:?}")))?;
        let key = format!("rooms/{}/config.json", self.room);
        self.write_json(&key, &mode).await?;
        self.notify("mode_changed", serde_json::json!({ "mode": mode.name }));
        Ok(mode)
    }

    // ── Tempo ───────────────────────────────────────────────────────

    pub async fn tempo(&self) -> Result<f64> {
        Ok(self.room_meta().await?.tempo)
    }

    /// Set tempo explicitly (clamped to the configured bounds).
    pub async fn set_tempo(&self, interval: f64) -> Result<f64> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(Error::InvalidArgument(
                "tempo must be a positive number of seconds".into(),
            ));
        }
        let clamped = interval.clamp(self.lifecycle.tempo_min, self.lifecycle.tempo_max);
        self.update_meta(|m| m.tempo = clamped).await?;
        self.notify("tempo_changed", serde_json::json!({ "tempo": clamped }));
        Ok(clamped)
    }

    /// Recalculate tempo from current load (supervisor pass).
    pub(crate) async fn recalc_tempo(&self) -> Result<f64> {
        let active = self
            .tasks(Some(masc_domain::types::TaskStatus::InProgress))
            .await?
            .len() as u32
            + self
                .tasks(Some(masc_domain::types::TaskStatus::Claimed))
                .await?
                .len() as u32;
        let tempo = self.lifecycle.tempo_for_load(active);
        self.update_meta(|m| m.tempo = tempo).await?;
        Ok(tempo)
    }

    // ── Status snapshot ─────────────────────────────────────────────

    pub async fn status(&self) -> Result<RoomStatus> {
        let meta = self.room_meta().await?;
        let mode = self.mode().await?;

        let mut agents_by_status: HashMap<String, usize> = HashMap::new();
        for agent in self.agents().await? {
            let label = serde_json::to_value(agent.status)?
                .as_str()
                .unwrap_or("unknown")
                .to_owned();
            *agents_by_status.entry(label).or_default() += 1;
        }

        let mut tasks_by_status: HashMap<String, usize> = HashMap::new();
        for task in self.tasks(None).await? {
            let label = serde_json::to_value(task.status)?
                .as_str()
                .unwrap_or("unknown")
                .to_owned();
            *tasks_by_status.entry(label).or_default() += 1;
        }

        let open_votes = self.open_votes().await?.len();
        let held_locks = self.locks().await?.len();
        let pending_handoffs = self.handoffs(Some(HandoffStatus::Pending)).await?.len();
        let message_seq = self.message_seq().await?;

        Ok(RoomStatus {
            room_id: self.room.clone(),
            cluster: self.cluster.clone(),
            paused: meta.paused,
            mode,
            tempo: meta.tempo,
            agents_by_status,
            tasks_by_status,
            open_votes,
            held_locks,
            pending_handoffs,
            message_seq,
        })
    }
}
