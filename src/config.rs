//! Configuration loading and management.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. YAML file: `--config`, else `TASKLIST_CONFIG_PATH`, else `<data_dir>/config.yaml`
//! 3. Environment: `TASKLIST_DATA_DIR`, `TASKLIST_DB_PATH`, `TASKLIST_PREFS_PATH`
//! 4. CLI flags (applied by the binary)

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::watcher::DEFAULT_DEBOUNCE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_CONFIG_PATH: &str = "TASKLIST_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "TASKLIST_DATA_DIR";
pub const ENV_DB_PATH: &str = "TASKLIST_DB_PATH";
pub const ENV_PREFS_PATH: &str = "TASKLIST_PREFS_PATH";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// Where the task database and preference file live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for relative paths. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub database: PathBuf,

    /// Preference YAML file.
    #[serde(default = "default_prefs_path")]
    pub preferences: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database: default_db_path(),
            preferences: default_prefs_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tasks.db")
}

fn default_prefs_path() -> PathBuf {
    PathBuf::from("preferences.yaml")
}

/// One-shot event queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Undelivered events buffered per controller before senders wait.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// Logging defaults (the CLI `--log`/`--verbose` flags and `RUST_LOG` win).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `tasklist=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// File watching for the `watch` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a burst of file changes is reported, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Platform data directory, falling back to `./.tasklist`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration from an optional explicit file, the
    /// environment, and defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        Self::discover_with(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`Config::discover`] with an injectable environment lookup.
    pub fn discover_with<F>(explicit: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(ENV_CONFIG_PATH).map(PathBuf::from));

        let mut config = match file {
            // An explicitly named file must exist
            Some(path) => Self::load(&path)?,
            None => {
                let data_dir = env(ENV_DATA_DIR)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_data_dir);
                let candidate = data_dir.join("config.yaml");
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "loading config");
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(env);
        Ok(config)
    }

    /// Apply `TASKLIST_*` overrides.
    pub fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env(ENV_DATA_DIR) {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(db) = env(ENV_DB_PATH) {
            self.paths.database = PathBuf::from(db);
        }
        if let Some(prefs) = env(ENV_PREFS_PATH) {
            self.paths.preferences = PathBuf::from(prefs);
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Database path, resolved against the data dir when relative.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.paths.database)
    }

    /// Preference file path, resolved against the data dir when relative.
    pub fn preferences_path(&self) -> PathBuf {
        self.resolve(&self.paths.preferences)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
