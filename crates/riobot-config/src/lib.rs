use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use riobot_types::UserId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Job and settings database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file path; defaults to `~/.riobot/jobs.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Scheduler engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How many seconds late a fire may run and still be delivered.
    #[serde(default = "default_misfire_grace_secs")]
    pub misfire_grace_secs: u64,
}

fn default_misfire_grace_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            misfire_grace_secs: default_misfire_grace_secs(),
        }
    }
}

/// Reminder feature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Keep the per-group on/off toggle across restarts.
    #[serde(default = "default_true")]
    pub persist_group_settings: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            persist_group_settings: true,
        }
    }
}

/// Conversational proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages kept per conversation.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_history() -> usize {
    10
}

fn default_system_prompt() -> String {
    "你是一个乐于助人的助手".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Top-level riobot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RioBotConfig {
    /// Users with superuser privilege.
    #[serde(default)]
    pub superusers: Vec<UserId>,
    /// Accepted command prefixes. An empty string makes the prefix optional.
    #[serde(default = "default_command_start")]
    pub command_start: Vec<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_command_start() -> Vec<String> {
    vec!["/".to_string(), String::new()]
}

fn default_true() -> bool {
    true
}

impl Default for RioBotConfig {
    fn default() -> Self {
        Self {
            superusers: Vec::new(),
            command_start: default_command_start(),
            storage: StorageConfig::default(),
            scheduler: SchedulerConfig::default(),
            reminder: ReminderConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl RioBotConfig {
    /// Resolve the database path, falling back to `~/.riobot/jobs.sqlite`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("jobs.sqlite")),
        }
    }
}

/// Resolve the riobot config directory (~/.riobot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".riobot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.riobot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<RioBotConfig, ConfigError> {
    load_config_at(&config_file_path()?)
}

/// Load `.env`, the config file at `path`, and environment overrides.
pub fn load_config_at(path: &Path) -> Result<RioBotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = load_config_from(path)?;
    apply_env_overrides(config, |var| std::env::var(var).ok())
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<RioBotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(RioBotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: RioBotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Apply `RIOBOT_SUPERUSERS` (comma-separated ids) and `RIOBOT_DB_PATH`.
pub fn apply_env_overrides(
    mut config: RioBotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RioBotConfig, ConfigError> {
    if let Some(raw) = lookup("RIOBOT_SUPERUSERS") {
        config.superusers = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<UserId>().map_err(|_| ConfigError::InvalidEnv {
                    var: "RIOBOT_SUPERUSERS",
                    value: s.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
    }
    if let Some(path) = lookup("RIOBOT_DB_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    create_dir(config_dir()?)
}

fn create_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Created config directory {}", dir.display());
    }
    Ok(dir)
}
