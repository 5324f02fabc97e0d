//! Advisory file locks: one holder per path, idempotent re-lock, default
//! TTL with supervisor reaping.

use masc_backend::keys;
use masc_domain::types::{normalize_lock_path, FileLock};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

impl RoomStore {
    /// Acquire (or refresh) a file lock.  Held-by-another is a conflict;
    /// re-lock by the holder extends the expiry.
    pub async fn lock_file(&self, agent_id: &str, file_path: &str) -> Result<FileLock> {
        let path = normalize_lock_path(file_path);
        if path.is_empty() {
            return Err(Error::InvalidArgument("file_path must not be empty".into()));
        }
        self.require_agent(agent_id).await?;

        let key = keys::lock_entry(&self.room, &path);
        let now = self.now();
        let ttl = self.lifecycle.lock_ttl;
        let expires_at = (ttl > 0.0).then_some(now + ttl);

        let lock = FileLock {
            file_path: path.clone(),
            holder: agent_id.to_owned(),
            acquired_at: now,
            expires_at,
        };
        let new_raw = serde_json::to_string(&lock)?;

        // Fast path: the lock is free.
        if self.cas_raw(&key, None, &new_raw).await? {
            self.notify(
                "lock_acquired",
                serde_json::json!({ "file_path": path, "agent_id": agent_id }),
            );
            return Ok(lock);
        }

        // Occupied: expired locks fall to the new claimant, the holder's
        // own re-lock refreshes, anyone else conflicts.
        let current_raw = self
            .read_raw(&key)
            .await?
            .ok_or_else(|| Error::Conflict(format!("lock on {path} lost a race")))?;
        let current: FileLock = serde_json::from_str(&current_raw)
            .map_err(|e| Error::Internal(format!("corrupt lock {path}: {e}")))?;

        if current.holder != agent_id && !current.expired(now) {
            return Err(Error::Conflict(format!(
                "{path} is locked by {}",
                current.holder
            )));
        }
        if !self.cas_raw(&key, Some(&current_raw), &new_raw).await? {
            return Err(Error::Conflict(format!("lock on {path} lost a race")));
        }
        self.notify(
            "lock_acquired",
            serde_json::json!({ "file_path": path, "agent_id": agent_id, "refreshed": current.holder == agent_id }),
        );
        Ok(lock)
    }

    /// Release a lock.  Only the holder may unlock; anyone else is
    /// forbidden.  Unlocking a free path is a not-found.
    pub async fn unlock_file(&self, agent_id: &str, file_path: &str) -> Result<()> {
        let path = normalize_lock_path(file_path);
        let key = keys::lock_entry(&self.room, &path);
        let _scope = self.backend.lock(&format!("locks:{path}")).await?;

        let current: FileLock = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{path} is not locked")))?;
        if current.holder != agent_id {
            return Err(Error::Forbidden(format!(
                "{path} is held by {}, not {agent_id}",
                current.holder
            )));
        }
        self.delete_key(&key).await?;
        self.notify(
            "lock_released",
            serde_json::json!({ "file_path": path, "agent_id": agent_id }),
        );
        Ok(())
    }

    /// All currently held locks.
    pub async fn locks(&self) -> Result<Vec<FileLock>> {
        let mut locks = Vec::new();
        for key in self.list_keys(&keys::locks_prefix(&self.room)).await? {
            if let Some(lock) = self.read_json::<FileLock>(&key).await? {
                locks.push(lock);
            }
        }
        locks.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(locks)
    }

    /// Drop every lock held by one agent (task completion, departure).
    pub(crate) async fn release_agent_locks(&self, agent_id: &str) -> Result<usize> {
        let mut released = 0;
        for key in self.list_keys(&keys::locks_prefix(&self.room)).await? {
            let Some(lock) = self.read_json::<FileLock>(&key).await? else {
                continue;
            };
            if lock.holder == agent_id {
                self.delete_key(&key).await?;
                released += 1;
                self.notify(
                    "lock_released",
                    serde_json::json!({ "file_path": lock.file_path, "agent_id": agent_id }),
                );
            }
        }
        Ok(released)
    }

    /// Supervisor sweep: reap expired locks.
    pub(crate) async fn sweep_expired_locks(&self) -> Result<usize> {
        if self.lifecycle.lock_ttl <= 0.0 {
            return Ok(0);
        }
        let now = self.now();
        let mut reaped = 0;
        for key in self.list_keys(&keys::locks_prefix(&self.room)).await? {
            let Some(lock) = self.read_json::<FileLock>(&key).await? else {
                continue;
            };
            if lock.expired(now) {
                self.delete_key(&key).await?;
                reaped += 1;
                self.notify(
                    "lock_expired",
                    serde_json::json!({ "file_path": lock.file_path, "agent_id": lock.holder }),
                );
            }
        }
        Ok(reaped)
    }
}
