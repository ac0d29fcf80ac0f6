//! Unified storage interface
//!
//! The `Library` owns one instance of every store, all built from the same
//! [`Config`] and sharing a single [`PathLocks`] registry. It is the entry
//! point a transport shell holds on to.
//!
//! ## Usage
//!
//! ```ignore
//! let library = Library::open()?;
//!
//! let mut tree = library.tree().load()?;
//! tree.folders.push(ContentNode::new("Books"));
//! library.tree().save(&tree)?;
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::assets::AssetStore;
use crate::changelog::{ChangelogCache, ReleaseSource};
use crate::config::Config;
use crate::documents::DocumentStore;
use crate::settings::SettingsStore;
use crate::storage::{PathLocks, StoreResult};
use crate::tree::TreeStore;

/// Every store of one data directory
pub struct Library {
    config: Config,
    tree: TreeStore,
    settings: SettingsStore,
    documents: DocumentStore,
    assets: AssetStore,
    changelog: ChangelogCache,
}

impl Library {
    /// Open the library described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open library")
    }

    /// Open the library with a specific configuration
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let locks = Arc::new(PathLocks::new());
        let changelog = ChangelogCache::from_config(&config, locks.clone())?;
        Ok(Self::assemble(config, locks, changelog))
    }

    /// Open the library with a custom release source
    pub fn with_release_source(config: Config, source: Box<dyn ReleaseSource>) -> Self {
        let locks = Arc::new(PathLocks::new());
        let changelog = ChangelogCache::new(config.changelog_path(), source, locks.clone());
        Self::assemble(config, locks, changelog)
    }

    fn assemble(config: Config, locks: Arc<PathLocks>, changelog: ChangelogCache) -> Self {
        Self {
            tree: TreeStore::from_config(&config, locks.clone()),
            settings: SettingsStore::from_config(&config, locks.clone()),
            documents: DocumentStore::from_config(&config, locks.clone()),
            assets: AssetStore::from_config(&config, locks),
            changelog,
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Sessions and profiles
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn changelog(&self) -> &ChangelogCache {
        &self.changelog
    }
}
