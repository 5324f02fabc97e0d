//! Room-scoped cache with TTL: lazy expiry on read plus a periodic sweep.
//! Values are a sealed family (encrypted at rest when a key is set).

use masc_backend::keys;
use masc_domain::types::{sanitize_cache_key, CacheEntry};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

impl RoomStore {
    pub async fn cache_set(
        &self,
        key: &str,
        value: String,
        ttl_secs: Option<f64>,
        tags: Vec<String>,
    ) -> Result<CacheEntry> {
        let sanitized = sanitize_cache_key(key);
        if sanitized.is_empty() {
            return Err(Error::InvalidArgument("cache key must not be empty".into()));
        }
        let now = self.now();
        let entry = CacheEntry {
            key: sanitized.clone(),
            value,
            created_at: now,
            expires_at: ttl_secs.filter(|t| *t > 0.0).map(|t| now + t),
            tags,
        };
        self.write_sealed(&keys::cache_entry(&self.room, &sanitized), &entry)
            .await?;
        Ok(entry)
    }

    /// Fetch an entry; an expired one is deleted on the spot and reported
    /// absent.
    pub async fn cache_get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let sanitized = sanitize_cache_key(key);
        let storage_key = keys::cache_entry(&self.room, &sanitized);
        let Some(entry) = self.read_sealed::<CacheEntry>(&storage_key).await? else {
            return Ok(None);
        };
        if entry.expired(self.now()) {
            self.delete_key(&storage_key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn cache_delete(&self, key: &str) -> Result<bool> {
        let sanitized = sanitize_cache_key(key);
        let storage_key = keys::cache_entry(&self.room, &sanitized);
        let existed = self.read_raw(&storage_key).await?.is_some();
        self.delete_key(&storage_key).await?;
        Ok(existed)
    }

    /// Live (unexpired) entries, optionally filtered by tag.
    pub async fn cache_list(&self, tag: Option<&str>) -> Result<Vec<CacheEntry>> {
        let now = self.now();
        let mut entries = Vec::new();
        for key in self.list_keys(&keys::cache_prefix(&self.room)).await? {
            let Some(entry) = self.read_sealed::<CacheEntry>(&key).await? else {
                continue;
            };
            if entry.expired(now) {
                continue;
            }
            if tag.map_or(true, |t| entry.tags.iter().any(|x| x == t)) {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Supervisor sweep: delete every expired entry.
    pub(crate) async fn sweep_expired_cache(&self) -> Result<usize> {
        let now = self.now();
        let mut swept = 0;
        for key in self.list_keys(&keys::cache_prefix(&self.room)).await? {
            let Some(entry) = self.read_sealed::<CacheEntry>(&key).await? else {
                continue;
            };
            if entry.expired(now) {
                self.delete_key(&key).await?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}
