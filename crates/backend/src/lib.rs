//! Pluggable persistence for the coordination kernel.
//!
//! The Room Store only ever talks to the [`Backend`] trait: a keyed object
//! store with compare-and-set, prefix listing, atomic line-append logs,
//! and advisory scope locks.  Four implementations ship:
//!
//! - [`MemoryBackend`] — in-process maps, single-instance only.
//! - [`FsBackend`] — JSON files under `.masc/`, `flock`-guarded so several
//!   processes can share a directory.
//! - [`RedisBackend`] — cross-instance, CAS via a Lua script.
//! - [`PostgresBackend`] — cross-instance, CAS via conditional UPDATE.
//!
//! Each primitive is atomic as observed by concurrent callers within one
//! process; `cas` is linearisable within a single backend instance.

mod crypto;
mod fs;
pub mod keys;
mod memory;
mod postgres;
mod redis_backend;
mod retry;

pub use crypto::Encryptor;
pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use redis_backend::RedisBackend;
pub use retry::with_retries;

use std::sync::Arc;

use async_trait::async_trait;

use masc_domain::config::{StorageConfig, StorageType};
use masc_domain::{Error, Result};

/// Guard for an advisory scope lock.  The lock is released when the guard
/// drops.  Re-entrant acquisition from the same task deadlocks — callers
/// hold at most one scope at a time.
pub type ScopeGuard = Box<dyn Send>;

/// Capability interface every backend implements.
///
/// Keys follow the canonical logical schema in [`keys`]; values are JSON
/// documents (or opaque encrypted envelopes).  Logs are ordered sequences
/// of single lines.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Compare-and-set: write `new` only if the current value equals
    /// `expected` (`None` = key absent).  Returns whether the swap won.
    async fn cas(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys under `prefix`, unordered.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Atomic single-line append to a log.
    async fn append(&self, log_key: &str, line: &str) -> Result<()>;

    /// Read `limit` lines starting at `offset` (0-based).  `limit = 0`
    /// means "to the end".
    async fn read_log(&self, log_key: &str, offset: u64, limit: u64) -> Result<Vec<String>>;

    /// Number of lines currently in the log.
    async fn log_len(&self, log_key: &str) -> Result<u64>;

    /// Move the whole log to `archive_key`, leaving the source empty.
    /// Guarded by the same lock as `append`.
    async fn rotate_log(&self, log_key: &str, archive_key: &str) -> Result<()>;

    /// Acquire an advisory lock on `scope`.
    async fn lock(&self, scope: &str) -> Result<ScopeGuard>;
}

/// Shared backend handle.
pub type SharedBackend = Arc<dyn Backend>;

/// Construct the backend selected by configuration.
pub async fn from_config(config: &StorageConfig) -> Result<SharedBackend> {
    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryBackend::new())),
        StorageType::Fs => Ok(Arc::new(FsBackend::new(config.state_dir())?)),
        StorageType::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| Error::InvalidArgument("MASC_REDIS_URL not set".into()))?;
            let prefix = format!("masc:{}", config.cluster_name());
            Ok(Arc::new(RedisBackend::connect(url, prefix).await?))
        }
        StorageType::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .ok_or_else(|| Error::InvalidArgument("MASC_POSTGRES_URL not set".into()))?;
            Ok(Arc::new(PostgresBackend::connect(url).await?))
        }
    }
}
