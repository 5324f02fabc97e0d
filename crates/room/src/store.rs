//! The store type itself plus the shared read/write helpers every entity
//! module builds on.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use masc_backend::{keys, with_retries, Encryptor, SharedBackend};
use masc_domain::clock::SharedClock;
use masc_domain::config::LifecycleConfig;
use masc_domain::types::{Mode, Room};
use masc_domain::{Error, Result};

use crate::bus::{Notification, NotificationBus, DEFAULT_RING_CAPACITY};
use crate::telemetry::TelemetryLog;

/// Canonical state owner for one room.
///
/// Cheap to clone is deliberately *not* a goal — wrap it in an `Arc` and
/// share that.
pub struct RoomStore {
    pub(crate) backend: SharedBackend,
    pub(crate) clock: SharedClock,
    pub(crate) bus: NotificationBus,
    pub(crate) encryptor: Encryptor,
    pub(crate) telemetry: TelemetryLog,
    pub(crate) room: String,
    pub(crate) cluster: String,
    pub(crate) lifecycle: LifecycleConfig,
}

impl RoomStore {
    /// Open (or create) the room and seed the notification bus above the
    /// persisted message seq so event ids stay monotone across restarts.
    pub async fn open(
        backend: SharedBackend,
        clock: SharedClock,
        encryptor: Encryptor,
        cluster: String,
        room: String,
        lifecycle: LifecycleConfig,
    ) -> Result<Self> {
        let persisted_seq: u64 = match backend.get(&keys::message_seq(&room)).await? {
            Some(raw) => raw.trim().parse().unwrap_or(0),
            None => 0,
        };
        let bus = NotificationBus::new(persisted_seq + 1, DEFAULT_RING_CAPACITY);
        let telemetry = TelemetryLog::new(backend.clone(), clock.clone(), room.clone());

        let store = Self {
            backend,
            clock,
            bus,
            encryptor,
            telemetry,
            room,
            cluster,
            lifecycle,
        };

        // Create the room record on first open.
        let meta_key = keys::room_meta(&store.room);
        if store.backend.get(&meta_key).await?.is_none() {
            let record = Room::new(&store.cluster, &store.room, store.now());
            let raw = serde_json::to_string(&record)?;
            store.backend.cas(&meta_key, None, &raw).await?;
        }

        Ok(store)
    }

    pub fn room_id(&self) -> &str {
        &self.room
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn telemetry(&self) -> &TelemetryLog {
        &self.telemetry
    }

    pub fn lifecycle(&self) -> &LifecycleConfig {
        &self.lifecycle
    }

    pub(crate) fn now(&self) -> f64 {
        self.clock.now()
    }

    // ── JSON document helpers ───────────────────────────────────────

    pub(crate) async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = with_retries("get", || self.backend.get(key)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).map_err(|e| {
                Error::Internal(format!("corrupt record at {key}: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        with_retries("set", || self.backend.set(key, &raw)).await
    }

    /// Read a record from a sealed (optionally encrypted) family.
    pub(crate) async fn read_sealed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = with_retries("get", || self.backend.get(key)).await?;
        match raw {
            Some(raw) => {
                let plain = self.encryptor.open(&raw)?;
                Ok(Some(serde_json::from_str(&plain).map_err(|e| {
                    Error::Internal(format!("corrupt record at {key}: {e}"))
                })?))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn write_sealed<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let plain = serde_json::to_string(value)?;
        let sealed = self.encryptor.seal(&plain)?;
        with_retries("set", || self.backend.set(key, &sealed)).await
    }

    /// CAS a sealed record from its previously-read raw form.
    pub(crate) async fn cas_sealed<T: Serialize>(
        &self,
        key: &str,
        expected_raw: Option<&str>,
        value: &T,
    ) -> Result<bool> {
        let plain = serde_json::to_string(value)?;
        let sealed = self.encryptor.seal(&plain)?;
        with_retries("cas", || self.backend.cas(key, expected_raw, &sealed)).await
    }

    /// Raw read for CAS flows that need the stored representation back.
    pub(crate) async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        with_retries("get", || self.backend.get(key)).await
    }

    pub(crate) async fn cas_raw(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool> {
        with_retries("cas", || self.backend.cas(key, expected, new)).await
    }

    pub(crate) async fn delete_key(&self, key: &str) -> Result<()> {
        with_retries("delete", || self.backend.delete(key)).await
    }

    pub(crate) async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        with_retries("list", || self.backend.list(prefix)).await
    }

    // ── Notifications ───────────────────────────────────────────────

    /// Publish a transport-level event (progress, shutdown) that has no
    /// backing state change.
    pub fn publish_event(&self, kind: &str, data: serde_json::Value) -> u64 {
        self.notify(kind, data)
    }

    /// Publish a committed state change.  Must only be called *after* the
    /// corresponding write succeeded.
    pub(crate) fn notify(&self, kind: &str, data: serde_json::Value) -> u64 {
        let seq = self.bus.assign_seq();
        self.bus.publish(Notification {
            seq,
            kind: kind.to_owned(),
            room: self.room.clone(),
            timestamp: self.now(),
            data,
        });
        seq
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status snapshot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One-call overview of the room, served by `masc_status` and
/// `/api/v1/status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomStatus {
    pub room_id: String,
    pub cluster: String,
    pub paused: bool,
    pub mode: Mode,
    pub tempo: f64,
    pub agents_by_status: HashMap<String, usize>,
    pub tasks_by_status: HashMap<String, usize>,
    pub open_votes: usize,
    pub held_locks: usize,
    pub pending_handoffs: usize,
    pub message_seq: u64,
}
