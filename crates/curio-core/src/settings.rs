//! Global settings store
//!
//! A single JSON document at a fixed path. Unlike the tree store, a missing
//! file is reported as `NotFound` rather than papered over with a default:
//! "no settings configured yet" is something the front end handles itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::models::GlobalSettings;
use crate::storage::persistence::{read_json, write_json};
use crate::storage::{PathLocks, StoreError, StoreResult};

/// Store for the global settings document
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    locks: Arc<PathLocks>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, locks: Arc<PathLocks>) -> Self {
        Self {
            path: path.into(),
            locks,
        }
    }

    /// Create a settings store at the configured location
    pub fn from_config(config: &Config, locks: Arc<PathLocks>) -> Self {
        Self::new(config.settings_path(), locks)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether settings have been saved yet
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the settings document
    pub fn load(&self) -> StoreResult<Value> {
        read_json(&self.path)
    }

    /// Load the settings and read the typed view
    pub fn load_view(&self) -> StoreResult<GlobalSettings> {
        let value = self.load()?;
        GlobalSettings::from_value(&value).map_err(|source| StoreError::InvalidFormat {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the settings document
    pub fn save(&self, settings: &Value) -> StoreResult<()> {
        self.locks
            .with_lock(&self.path, || write_json(&self.path, settings))
    }
}
