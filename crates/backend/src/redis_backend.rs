//! Redis backend — cross-instance coordination for clustered rooms.
//!
//! Keys carry a `masc:{cluster}` prefix so several clusters can share one
//! Redis.  CAS runs as a Lua script for linearisability; logs are Redis
//! lists; scope locks are `SET NX` leases with a safety TTL, released by
//! a compare-and-delete script so an expired lease is never stolen back.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use async_trait::async_trait;

use masc_domain::{Error, Result};

use crate::{Backend, ScopeGuard};

/// Safety TTL on scope leases, in case a holder dies mid-operation.
const SCOPE_LEASE_SECS: u64 = 30;

const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
local expected = ARGV[1]
if (expected == '' and current == false) or (current == expected) then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisBackend {
    conn: ConnectionManager,
    prefix: String,
    cas: Script,
    release: Script,
}

impl RedisBackend {
    pub async fn connect(url: &str, prefix: String) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| Error::BackendFatal(format!("redis: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::BackendTransient(format!("redis connect: {e}")))?;
        Ok(Self {
            conn,
            prefix,
            cas: Script::new(CAS_SCRIPT),
            release: Script::new(RELEASE_SCRIPT),
        })
    }

    fn full(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

fn map_err(e: redis::RedisError) -> Error {
    if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() {
        Error::BackendTransient(format!("redis: {e}"))
    } else {
        Error::BackendFatal(format!("redis: {e}"))
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(self.full(key)).await.map_err(map_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.full(key), value)
            .await
            .map_err(map_err)
    }

    async fn cas(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        // Absent is encoded as the empty string: values here are JSON
        // documents, which are never empty.
        let won: i64 = self
            .cas
            .key(self.full(key))
            .arg(expected.unwrap_or(""))
            .arg(new)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(won == 1)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.full(key)).await.map_err(map_err)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:{prefix}*", self.prefix);
        let mut keys = Vec::new();
        let mut iter = conn
            .scan_match::<_, String>(pattern)
            .await
            .map_err(map_err)?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        drop(iter);
        let strip = format!("{}:", self.prefix);
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&strip).map(str::to_owned))
            .collect())
    }

    async fn append(&self, log_key: &str, line: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(self.full(log_key), line)
            .await
            .map_err(map_err)
    }

    async fn read_log(&self, log_key: &str, offset: u64, limit: u64) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let stop = if limit == 0 {
            -1
        } else {
            (offset + limit) as isize - 1
        };
        conn.lrange(self.full(log_key), offset as isize, stop)
            .await
            .map_err(map_err)
    }

    async fn log_len(&self, log_key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: i64 = conn.llen(self.full(log_key)).await.map_err(map_err)?;
        Ok(len.max(0) as u64)
    }

    async fn rotate_log(&self, log_key: &str, archive_key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        // RENAME fails on a missing source; an empty log is a no-op.
        let exists: bool = conn.exists(self.full(log_key)).await.map_err(map_err)?;
        if !exists {
            return Ok(());
        }
        let _: () = redis::cmd("RENAME")
            .arg(self.full(log_key))
            .arg(self.full(archive_key))
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn lock(&self, scope: &str) -> Result<ScopeGuard> {
        let key = self.full(&format!("scopes/{scope}"));
        let lease_id = uuid_like();
        let mut conn = self.conn.clone();
        loop {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(&lease_id)
                .arg("NX")
                .arg("EX")
                .arg(SCOPE_LEASE_SECS)
                .query_async(&mut conn)
                .await
                .map_err(map_err)?;
            if acquired.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        Ok(Box::new(RedisScopeGuard {
            conn: self.conn.clone(),
            release: self.release.clone(),
            key,
            lease_id,
        }))
    }
}

struct RedisScopeGuard {
    conn: ConnectionManager,
    release: Script,
    key: String,
    lease_id: String,
}

impl Drop for RedisScopeGuard {
    fn drop(&mut self) {
        let mut conn = self.conn.clone();
        let release = self.release.clone();
        let key = std::mem::take(&mut self.key);
        let lease_id = std::mem::take(&mut self.lease_id);
        tokio::spawn(async move {
            let result: std::result::Result<i64, _> = release
                .key(&key)
                .arg(&lease_id)
                .invoke_async(&mut conn)
                .await;
            if let Err(e) = result {
                tracing::warn!(key = %key, error = %e, "failed to release redis scope lease");
            }
        });
    }
}

/// Random lease id without pulling uuid into this module's hot path.
fn uuid_like() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
