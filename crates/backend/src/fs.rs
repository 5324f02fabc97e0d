//! Filesystem backend — JSON files under `.masc/`.
//!
//! Layout matches the canonical schema in [`crate::keys`] one-to-one:
//! `rooms/{room}/agents/{id}.json`, `rooms/{room}/messages.jsonl`, etc.
//!
//! Consistency across processes sharing one `.masc/` directory:
//! - every JSON write goes to a tempfile in the target directory and is
//!   renamed into place;
//! - `cas`, `append`, and `rotate_log` take an advisory `flock` on a
//!   sidecar `.lock` file first;
//! - files are created with owner-only permissions.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;

use masc_domain::{Error, Result};

use crate::{keys, Backend, ScopeGuard};

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn sidecar_lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.lock"))
    }

    /// Take an exclusive flock on the sidecar for `key`.
    fn flock_sidecar(&self, path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        restrict_permissions(&file)?;
        file.lock_exclusive()
            .map_err(|e| Error::BackendTransient(format!("flock {}: {e}", path.display())))?;
        Ok(file)
    }

    /// Atomic write: tempfile in the target directory, then rename.
    fn write_atomic(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let dir = path
            .parent()
            .ok_or_else(|| Error::Internal(format!("key {key} has no parent")))?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::BackendFatal(format!("tempfile: {e}")))?;
        restrict_permissions(tmp.as_file())?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path)
            .map_err(|e| Error::BackendFatal(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }

    fn read_if_exists(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_if_exists(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_atomic(key, value)
    }

    async fn cas(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let _flock = self.flock_sidecar(&self.sidecar_lock_path(key))?;
        let current = self.read_if_exists(key)?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.write_atomic(key, new)?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        collect_keys(&self.root, &self.root, &mut out)?;
        out.retain(|k| k.starts_with(prefix) && !k.ends_with(".lock"));
        Ok(out)
    }

    async fn append(&self, log_key: &str, line: &str) -> Result<()> {
        let _flock = self.flock_sidecar(&self.sidecar_lock_path(log_key))?;
        let path = self.path_for(log_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        restrict_permissions(&file)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }

    async fn read_log(&self, log_key: &str, offset: u64, limit: u64) -> Result<Vec<String>> {
        let path = self.path_for(log_key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let iter = reader
            .lines()
            .skip(offset as usize)
            .filter_map(|l| l.ok())
            .filter(|l| !l.is_empty());
        let out = if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit as usize).collect()
        };
        Ok(out)
    }

    async fn log_len(&self, log_key: &str) -> Result<u64> {
        let path = self.path_for(log_key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        Ok(reader.lines().filter_map(|l| l.ok()).count() as u64)
    }

    async fn rotate_log(&self, log_key: &str, archive_key: &str) -> Result<()> {
        let _flock = self.flock_sidecar(&self.sidecar_lock_path(log_key))?;
        let src = self.path_for(log_key);
        if !src.exists() {
            return Ok(());
        }
        let dst = self.path_for(archive_key);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &dst)?;
        Ok(())
    }

    async fn lock(&self, scope: &str) -> Result<ScopeGuard> {
        let path = self
            .root
            .join("scopes")
            .join(format!("{}.lock", keys::sanitize_component(scope)));
        // flock blocks in this thread; scope locks are held briefly, and
        // contention across processes is the point of taking them at all.
        let file = self.flock_sidecar(&path)?;
        Ok(Box::new(FlockGuard { file }))
    }
}

struct FlockGuard {
    file: File,
}

impl Drop for FlockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn collect_keys(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_keys(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    file.set_permissions(perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, FsBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join(".masc")).unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn set_get_roundtrip_through_files() {
        let (_dir, backend) = backend();
        backend
            .set("rooms/main/agents/a.json", r#"{"id":"a"}"#)
            .await
            .unwrap();
        let value = backend.get("rooms/main/agents/a.json").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"id":"a"}"#));
        assert_eq!(backend.get("rooms/main/agents/b.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cas_on_absent_and_present() {
        let (_dir, backend) = backend();
        assert!(backend.cas("k.json", None, "v1").await.unwrap());
        assert!(!backend.cas("k.json", None, "v2").await.unwrap());
        assert!(backend.cas("k.json", Some("v1"), "v2").await.unwrap());
        assert!(!backend.cas("k.json", Some("v1"), "v3").await.unwrap());
    }

    #[tokio::test]
    async fn list_excludes_sidecars() {
        let (_dir, backend) = backend();
        backend.set("rooms/r/tasks/t1.json", "{}").await.unwrap();
        backend.cas("rooms/r/tasks/t1.json", Some("{}"), "{}").await.unwrap();
        let keys = backend.list("rooms/r/tasks/").await.unwrap();
        assert_eq!(keys, vec!["rooms/r/tasks/t1.json"]);
    }

    #[tokio::test]
    async fn append_and_read_log() {
        let (_dir, backend) = backend();
        backend.append("rooms/r/messages.jsonl", "{\"seq\":1}").await.unwrap();
        backend.append("rooms/r/messages.jsonl", "{\"seq\":2}").await.unwrap();
        let lines = backend.read_log("rooms/r/messages.jsonl", 0, 0).await.unwrap();
        assert_eq!(lines, vec!["{\"seq\":1}", "{\"seq\":2}"]);
        let tail = backend.read_log("rooms/r/messages.jsonl", 1, 0).await.unwrap();
        assert_eq!(tail, vec!["{\"seq\":2}"]);
    }

    #[tokio::test]
    async fn rotate_moves_log() {
        let (_dir, backend) = backend();
        backend.append("rooms/r/telemetry.jsonl", "{}").await.unwrap();
        backend
            .rotate_log("rooms/r/telemetry.jsonl", "rooms/r/telemetry-2026-01-01.jsonl")
            .await
            .unwrap();
        assert_eq!(backend.log_len("rooms/r/telemetry.jsonl").await.unwrap(), 0);
        assert_eq!(
            backend
                .log_len("rooms/r/telemetry-2026-01-01.jsonl")
                .await
                .unwrap(),
            1
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, backend) = backend();
        backend.set("rooms/r/cache/k.json", "v").await.unwrap();
        let meta = fs::metadata(dir.path().join(".masc/rooms/r/cache/k.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
