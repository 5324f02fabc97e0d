//! The room's append-only message log.
//!
//! Sequence numbers are strictly increasing with no gaps within one
//! process; the counter is persisted so seq continues above the max after
//! restart.  Appends hold the `messages` scope so the counter and the log
//! stay in lockstep — which also makes `seq` a direct line offset.

use masc_backend::keys;
use masc_domain::types::{Message, MessageKind, MessagePriority};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

/// Hard cap on one page of messages.
const MAX_PAGE: u64 = 500;

impl RoomStore {
    /// Append a broadcast (or system) message and publish it.
    pub async fn broadcast(
        &self,
        sender: &str,
        kind: MessageKind,
        body: serde_json::Value,
        priority: MessagePriority,
    ) -> Result<Message> {
        if sender.is_empty() {
            return Err(Error::InvalidArgument("sender must not be empty".into()));
        }
        let _scope = self.backend.lock("messages").await?;

        let seq_key = keys::message_seq(&self.room);
        let next_seq: u64 = match self.read_raw(&seq_key).await? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or(0) + 1,
            None => 1,
        };

        let message = Message {
            seq: next_seq,
            timestamp: self.now(),
            sender: sender.to_owned(),
            kind,
            body,
            priority,
        };
        let line = serde_json::to_string(&message)?;
        let log_key = keys::messages_log(&self.room);
        self.backend.append(&log_key, &line).await?;
        self.backend.set(&seq_key, &next_seq.to_string()).await?;

        self.notify("message", serde_json::to_value(&message)?);
        Ok(message)
    }

    /// Messages with `seq > since_seq`, oldest first, capped at `limit`.
    pub async fn messages(&self, since_seq: u64, limit: u64) -> Result<Vec<Message>> {
        let limit = if limit == 0 { MAX_PAGE } else { limit.min(MAX_PAGE) };
        let log_key = keys::messages_log(&self.room);
        // seq N sits at line offset N-1, so everything after since_seq
        // starts at offset since_seq.  The filter below is a guard against
        // logs written by older processes.
        let lines = self.backend.read_log(&log_key, since_seq, limit).await?;
        let mut out: Vec<Message> = lines
            .iter()
            .filter_map(|line| serde_json::from_str::<Message>(line).ok())
            .filter(|m| m.seq > since_seq)
            .collect();
        out.sort_by_key(|m| m.seq);
        out.truncate(limit as usize);
        Ok(out)
    }

    /// Highest message seq handed out so far.
    pub async fn message_seq(&self) -> Result<u64> {
        let raw = self.read_raw(&keys::message_seq(&self.room)).await?;
        Ok(raw.and_then(|r| r.trim().parse().ok()).unwrap_or(0))
    }
}
