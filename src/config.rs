//! Desktop configuration: file-backed defaults, environment and command-line overrides.

use clap::Parser;
use jira_worklog::tracker::{DEFAULT_ASSIGNED_QUERY, DEFAULT_JIRA_BINARY, DEFAULT_TIMEOUT_SECS};
use jira_worklog::JiraCliConfig;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the configured username.
pub const USERNAME_ENV: &str = "JIRA_TIMER_USERNAME";

/// Username baked in by `build.rs` from `.env`, if any.
pub const BUILD_DEFAULT_USERNAME: Option<&str> = option_env!("JIRA_TIMER_DEFAULT_USERNAME");

fn default_jira_binary() -> String {
    DEFAULT_JIRA_BINARY.to_string()
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_assigned_query() -> String {
    DEFAULT_ASSIGNED_QUERY.to_string()
}

/// Command-line flags.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "jira-timer", version, about = "Menu-bar timer that logs work to Jira")]
pub struct CliArgs {
    /// Your JIRA username
    #[arg(long)]
    pub username: Option<String>,

    /// Path or name of the jira executable
    #[arg(long)]
    pub jira_binary: Option<String>,
}

/// Settings persisted in `config.json`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub username: Option<String>,
    #[serde(default = "default_jira_binary")]
    pub jira_binary: String,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_assigned_query")]
    pub assigned_query: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            jira_binary: default_jira_binary(),
            command_timeout_secs: default_command_timeout_secs(),
            assigned_query: default_assigned_query(),
        }
    }
}

/// Everything the runtime needs once configuration sources are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub username: String,
    pub jira: JiraCliConfig,
}

/// Loads and saves `config.json` in the platform config directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Points at `config.json` in the platform config directory.
    pub fn new() -> Result<Self, String> {
        let dirs = directories::ProjectDirs::from("com", "jiratimer", "jira-timer")
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        let path = dirs.config_dir().join("config.json");
        Ok(Self { path })
    }

    /// Location of the config file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            return Config::default();
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read {}: {}", self.path.display(), err);
                return Config::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            warn!("Ignoring invalid config {}: {}", self.path.display(), err);
            Config::default()
        })
    }

    /// Persists config to disk, creating parent directories when needed.
    pub fn save(&self, config: &Config) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Merges flags, environment, file and build default. An empty username is an error.
///
/// Username precedence: `--username`, `JIRA_TIMER_USERNAME`, config file, build
/// default, then the login name from `USER`/`USERNAME`.
pub fn resolve_settings<F>(
    cli: &CliArgs,
    config: &Config,
    build_default: Option<&str>,
    env: F,
) -> Result<Settings, String>
where
    F: Fn(&str) -> Option<String>,
{
    let username = [
        cli.username.clone(),
        env(USERNAME_ENV),
        config.username.clone(),
        build_default.map(str::to_string),
        env("USER"),
        env("USERNAME"),
    ]
    .into_iter()
    .flatten()
    .map(|value| value.trim().to_string())
    .find(|value| !value.is_empty())
    .ok_or_else(|| {
        format!(
            "No JIRA username configured; pass --username or set {}",
            USERNAME_ENV
        )
    })?;

    let binary = cli
        .jira_binary
        .clone()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.jira_binary.clone());
    let binary = if binary.trim().is_empty() {
        default_jira_binary()
    } else {
        binary
    };

    let query = if config.assigned_query.trim().is_empty() {
        default_assigned_query()
    } else {
        config.assigned_query.clone()
    };

    let jira = JiraCliConfig::default()
        .with_binary(binary)
        .with_timeout(Duration::from_secs(config.command_timeout_secs.max(1)))
        .with_assigned_query(query);

    Ok(Settings { username, jira })
}
