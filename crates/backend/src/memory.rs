//! In-process backend — the default for tests and single-node setups.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use masc_domain::Result;

use crate::{Backend, ScopeGuard};

#[derive(Default)]
pub struct MemoryBackend {
    kv: RwLock<HashMap<String, String>>,
    logs: RwLock<HashMap<String, Vec<String>>>,
    scopes: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_mutex(&self, scope: &str) -> Arc<AsyncMutex<()>> {
        self.scopes
            .lock()
            .entry(scope.to_owned())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn cas(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let mut kv = self.kv.write();
        let current = kv.get(key).map(String::as_str);
        if current == expected {
            kv.insert(key.to_owned(), new.to_owned());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.kv.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .kv
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn append(&self, log_key: &str, line: &str) -> Result<()> {
        self.logs
            .write()
            .entry(log_key.to_owned())
            .or_default()
            .push(line.to_owned());
        Ok(())
    }

    async fn read_log(&self, log_key: &str, offset: u64, limit: u64) -> Result<Vec<String>> {
        let logs = self.logs.read();
        let lines = match logs.get(log_key) {
            Some(lines) => lines,
            None => return Ok(Vec::new()),
        };
        let iter = lines.iter().skip(offset as usize);
        let out = if limit == 0 {
            iter.cloned().collect()
        } else {
            iter.take(limit as usize).cloned().collect()
        };
        Ok(out)
    }

    async fn log_len(&self, log_key: &str) -> Result<u64> {
        Ok(self.logs.read().get(log_key).map_or(0, |l| l.len() as u64))
    }

    async fn rotate_log(&self, log_key: &str, archive_key: &str) -> Result<()> {
        let mut logs = self.logs.write();
        let lines = logs.remove(log_key).unwrap_or_default();
        logs.insert(archive_key.to_owned(), lines);
        Ok(())
    }

    async fn lock(&self, scope: &str) -> Result<ScopeGuard> {
        let mutex = self.scope_mutex(scope);
        let guard = mutex.lock_owned().await;
        Ok(Box::new(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cas_wins_once() {
        let backend = MemoryBackend::new();
        backend.set("k", "a").await.unwrap();
        assert!(backend.cas("k", Some("a"), "b").await.unwrap());
        assert!(!backend.cas("k", Some("a"), "c").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn cas_absent_expectation() {
        let backend = MemoryBackend::new();
        assert!(backend.cas("fresh", None, "v").await.unwrap());
        assert!(!backend.cas("fresh", None, "w").await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let backend = MemoryBackend::new();
        backend.set("rooms/main/tasks/t1.json", "{}").await.unwrap();
        backend.set("rooms/main/tasks/t2.json", "{}").await.unwrap();
        backend.set("rooms/main/agents/a.json", "{}").await.unwrap();
        let mut keys = backend.list("rooms/main/tasks/").await.unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec!["rooms/main/tasks/t1.json", "rooms/main/tasks/t2.json"]
        );
    }

    #[tokio::test]
    async fn log_append_read_rotate() {
        let backend = MemoryBackend::new();
        for n in 1..=5 {
            backend.append("log", &format!("line{n}")).await.unwrap();
        }
        assert_eq!(backend.log_len("log").await.unwrap(), 5);
        assert_eq!(
            backend.read_log("log", 2, 2).await.unwrap(),
            vec!["line3", "line4"]
        );
        backend.rotate_log("log", "log-archive").await.unwrap();
        assert_eq!(backend.log_len("log").await.unwrap(), 0);
        assert_eq!(backend.log_len("log-archive").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn scope_lock_excludes_concurrent_holder() {
        let backend = Arc::new(MemoryBackend::new());
        let guard = backend.lock("scope").await.unwrap();

        let contender = {
            let backend = backend.clone();
            tokio::spawn(async move {
                let _guard = backend.lock("scope").await.unwrap();
            })
        };
        // The contender cannot finish while the guard is held.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
