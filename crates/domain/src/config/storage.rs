use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{env_string, ConfigIssue};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage backend selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    Memory,
    Fs,
    Redis,
    Postgres,
}

impl StorageType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "memory" => Some(Self::Memory),
            "fs" => Some(Self::Fs),
            "redis" => Some(Self::Redis),
            "postgres" => Some(Self::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `MASC_STORAGE_TYPE` — memory | fs | redis | postgres.
    #[serde(default)]
    pub storage_type: StorageType,
    /// `MASC_REDIS_URL`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// `MASC_POSTGRES_URL`.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// `MASC_ROOT` (alias `MASC_BASE_PATH`) — filesystem root of `.masc/`.
    #[serde(default = "d_root")]
    pub root: PathBuf,
    /// `MASC_CLUSTER_NAME` — logical cluster id, default `basename(root)`.
    #[serde(default)]
    pub cluster: Option<String>,
    /// `MASC_ROOM` — room id this server coordinates, default `"main"`.
    #[serde(default = "d_room")]
    pub room: String,
    /// `MASC_ENCRYPTION_KEY` — 32-byte hex; enables at-rest encryption.
    #[serde(default, skip_serializing)]
    pub encryption_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            redis_url: None,
            postgres_url: None,
            root: d_root(),
            cluster: None,
            room: d_room(),
            encryption_key: None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let storage_type = env_string("MASC_STORAGE_TYPE")
            .and_then(|v| StorageType::parse(&v))
            .unwrap_or_default();
        let root = env_string("MASC_ROOT")
            .or_else(|| env_string("MASC_BASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(d_root);
        Self {
            storage_type,
            redis_url: env_string("MASC_REDIS_URL"),
            postgres_url: env_string("MASC_POSTGRES_URL"),
            root,
            cluster: env_string("MASC_CLUSTER_NAME"),
            room: env_string("MASC_ROOM").unwrap_or_else(d_room),
            encryption_key: env_string("MASC_ENCRYPTION_KEY"),
        }
    }

    /// Effective cluster name: explicit, or the basename of the root.
    pub fn cluster_name(&self) -> String {
        if let Some(name) = &self.cluster {
            return name.clone();
        }
        basename(&self.root)
    }

    /// Where `.masc/` state lives for the fs backend.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".masc")
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        match self.storage_type {
            StorageType::Redis if self.redis_url.is_none() => {
                issues.push(ConfigIssue::error(
                    "storage.redis_url",
                    "MASC_STORAGE_TYPE=redis requires MASC_REDIS_URL",
                ));
            }
            StorageType::Postgres if self.postgres_url.is_none() => {
                issues.push(ConfigIssue::error(
                    "storage.postgres_url",
                    "MASC_STORAGE_TYPE=postgres requires MASC_POSTGRES_URL",
                ));
            }
            _ => {}
        }
        if let Some(key) = &self.encryption_key {
            let ok = key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit());
            if !ok {
                issues.push(ConfigIssue::error(
                    "storage.encryption_key",
                    "MASC_ENCRYPTION_KEY must be 32 bytes of hex (64 chars)",
                ));
            }
        }
    }
}

fn d_root() -> PathBuf {
    PathBuf::from(".")
}
fn d_room() -> String {
    "main".into()
}

fn basename(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".into())
}
