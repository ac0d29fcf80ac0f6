//! Path-addressed JSON documents
//!
//! Sessions and profiles are opaque JSON values stored wherever the caller
//! asks. Relative paths resolve against the data directory, so the front
//! end's `./Profiles/<name>.json` convention lands next to the other state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::storage::persistence::{ensure_parent, read_json, write_json};
use crate::storage::{PathLocks, StoreError, StoreResult};

/// Generic load/save/rename of JSON documents
#[derive(Debug, Clone)]
pub struct DocumentStore {
    base_dir: PathBuf,
    locks: Arc<PathLocks>,
}

impl DocumentStore {
    /// Create a store resolving relative paths against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, locks: Arc<PathLocks>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks,
        }
    }

    /// Create a store rooted at the configured data directory
    pub fn from_config(config: &Config, locks: Arc<PathLocks>) -> Self {
        Self::new(config.data_dir.clone(), locks)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a caller-supplied path
    ///
    /// Absolute paths are used verbatim; relative ones are joined onto the
    /// base directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Check whether a document exists at `path`
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        !path.as_os_str().is_empty() && self.resolve(path).is_file()
    }

    /// Load the document at `path`
    ///
    /// Fails with `NotFound` for an empty or missing path and with
    /// `InvalidFormat` when the file is not valid JSON.
    pub fn load(&self, path: impl AsRef<Path>) -> StoreResult<Value> {
        let resolved = self.resolve_non_empty(path.as_ref())?;
        read_json(&resolved)
    }

    /// Write `document` to `path`, replacing any existing file
    ///
    /// Missing parent directories are created.
    pub fn save(&self, path: impl AsRef<Path>, document: &Value) -> StoreResult<PathBuf> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::from_write(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty path"),
                path.to_path_buf(),
            ));
        }
        let resolved = self.resolve(path);
        self.locks
            .with_lock(&resolved, || write_json(&resolved, document))?;
        Ok(resolved)
    }

    /// Move the document at `old` to `new` without rewriting its content
    ///
    /// Fails with `NotFound` when `old` does not exist. Missing parents of
    /// `new` are created; an existing file at `new` is replaced.
    pub fn rename(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let from = self.resolve_non_empty(old.as_ref())?;
        let new = new.as_ref();
        if new.as_os_str().is_empty() {
            return Err(StoreError::from_write(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty target path"),
                new.to_path_buf(),
            ));
        }
        let to = self.resolve(new);

        self.locks.with_locks(&[&from, &to], || {
            if !from.exists() {
                return Err(StoreError::NotFound { path: from.clone() });
            }
            ensure_parent(&to)?;
            fs::rename(&from, &to).map_err(|source| StoreError::RenameFailed {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            info!(from = %from.display(), to = %to.display(), "renamed document");
            Ok(())
        })?;

        Ok(to)
    }

    fn resolve_non_empty(&self, path: &Path) -> StoreResult<PathBuf> {
        if path.as_os_str().is_empty() {
            debug!("document path is empty");
            return Err(StoreError::EmptyPath);
        }
        Ok(self.resolve(path))
    }
}
