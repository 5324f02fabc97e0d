//! Server configuration.
//!
//! Every option is an environment variable with a single effect (see the
//! `MASC_*` names on each field).  `Config::from_env` reads the process
//! environment once at startup; `Config::validate` reports issues with a
//! severity so `serve` can refuse to start on hard errors.

mod drift;
mod lifecycle;
mod limits;
mod server;
mod storage;

pub use drift::*;
pub use lifecycle::*;
pub use limits::*;
pub use server::*;
pub use storage::*;

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub limits: RateLimitConfig,
    #[serde(default)]
    pub drift: DriftConfig,
}

impl Config {
    /// Build the whole tree from `MASC_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            storage: StorageConfig::from_env(),
            lifecycle: LifecycleConfig::from_env(),
            limits: RateLimitConfig::from_env(),
            drift: DriftConfig::from_env(),
        }
    }

    /// Validate the configuration, returning all issues found.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        self.server.validate(&mut issues);
        self.storage.validate(&mut issues);
        self.lifecycle.validate(&mut issues);
        self.limits.validate(&mut issues);
        self.drift.validate(&mut issues);
        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

// ── env parse helpers, shared by the section modules ────────────────

pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub(crate) fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        let errors: Vec<_> = config
            .validate()
            .into_iter()
            .filter(|i| i.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "default config has errors: {errors:?}");
    }

    #[test]
    fn issue_display() {
        let issue = ConfigIssue::error("server.port", "out of range");
        assert_eq!(issue.to_string(), "[ERROR] server.port: out of range");
    }
}
