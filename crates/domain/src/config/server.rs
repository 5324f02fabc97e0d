use serde::{Deserialize, Serialize};

use super::{env_parse, env_string, ConfigIssue};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `MASC_PORT` — HTTP bind port.
    #[serde(default = "d_port")]
    pub port: u16,
    /// `MASC_HOST` — bind address.
    #[serde(default = "d_host")]
    pub host: String,
    /// `MASC_TOKEN` — bearer token enabling auth when set.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// `MASC_TOKENS_FILE` — newline-delimited extra bearer tokens.
    #[serde(default)]
    pub tokens_file: Option<String>,
    /// `MASC_LOG_LEVEL` — debug | info | warn | error.
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8935,
            host: "127.0.0.1".into(),
            token: None,
            tokens_file: None,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("MASC_PORT", 8935),
            host: env_string("MASC_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            token: env_string("MASC_TOKEN"),
            tokens_file: env_string("MASC_TOKENS_FILE"),
            log_level: env_string("MASC_LOG_LEVEL").unwrap_or_else(|| "info".into()),
        }
    }

    /// Whether bearer auth is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.token.is_some() || self.tokens_file.is_some()
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.port == 0 {
            issues.push(ConfigIssue::error("server.port", "port must be non-zero"));
        }
        if !matches!(self.log_level.as_str(), "debug" | "info" | "warn" | "error") {
            issues.push(ConfigIssue::warning(
                "server.log_level",
                format!("unknown level {:?}, falling back to info", self.log_level),
            ));
        }
        if !self.auth_enabled() {
            issues.push(ConfigIssue::warning(
                "server.token",
                "no MASC_TOKEN configured; requests are unauthenticated",
            ));
        }
    }
}

fn d_port() -> u16 {
    8935
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8935);
        assert!(!config.auth_enabled());
    }

    #[test]
    fn zero_port_is_an_error() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert!(issues
            .iter()
            .any(|i| i.field == "server.port" && i.severity == super::super::ConfigSeverity::Error));
    }
}
