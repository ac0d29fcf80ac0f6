//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/curio/config.toml)
//! 3. Environment variables (CURIO_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! Every persisted artifact lives at a fixed name under `data_dir`, so
//! pointing `data_dir` at a temporary directory isolates a whole library.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "CURIO";

/// Default timeout for the changelog request
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Name of the asset directory; also the URL prefix assets are served under
pub const ASSET_DIR_NAME: &str = "IMG";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the tree, settings, changelog cache and assets
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Release-listing endpoint (JSON array, newest first)
    #[serde(default)]
    pub changelog_url: Option<String>,

    /// Timeout for the changelog request, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            changelog_url: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            log_file: None,
        }
    }
}

impl Config {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CURIO_DATA_DIR, CURIO_CHANGELOG_URL, CURIO_FETCH_TIMEOUT_SECS)
    /// 2. Config file (~/.config/curio/config.toml or CURIO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit `--config` path
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // Empty string clears the URL
        if let Ok(val) = std::env::var(format!("{}_CHANGELOG_URL", ENV_PREFIX)) {
            self.changelog_url = if val.is_empty() { None } else { Some(val) };
        }

        // Unparseable values are ignored
        if let Ok(val) = std::env::var(format!("{}_FETCH_TIMEOUT_SECS", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse() {
                self.fetch_timeout_secs = secs;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with CURIO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("curio")
            .join("config.toml")
    }

    /// Path of the content tree document
    pub fn tree_path(&self) -> PathBuf {
        self.data_dir.join("data.json")
    }

    /// Path of the global settings document
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("global_settings.json")
    }

    /// Path of the cached release list
    pub fn changelog_path(&self) -> PathBuf {
        self.data_dir.join("changelog_cache.json")
    }

    /// Directory holding ingested images
    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join(ASSET_DIR_NAME)
    }

    /// Conventional directory for profile session files
    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("Profiles")
    }

    /// Conventional session file for the profile called `name`
    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(format!("{}.json", name))
    }

    /// Changelog request timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("curio")
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
