//! Command-line interface for `masc-server`.

use clap::{Parser, Subcommand};

use masc_domain::config::{Config, ConfigSeverity};

/// MASC — a coordination server for multi-agent workspaces.
#[derive(Debug, Parser)]
#[command(name = "masc-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the environment-derived configuration and exit non-zero
    /// on errors.
    Validate,
    /// Print the effective configuration (secrets redacted).
    Show,
}

/// Validate and report; returns whether the config is usable.
pub fn validate(config: &Config) -> bool {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => eprintln!("{issue}"),
            ConfigSeverity::Error => eprintln!("{issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        eprintln!("configuration failed with {errors} error(s)");
        return false;
    }
    println!("configuration ok ({} warning(s))", issues.len() - errors);
    true
}

/// Print the effective configuration.  Secret fields are marked
/// `skip_serializing` in the config tree, so nothing sensitive leaks.
pub fn show(config: &Config) {
    match serde_json::to_string_pretty(config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}
