//! Content tree store
//!
//! Owns the main hierarchical document (`data.json`).
//!
//! ## Loading rules
//!
//! - Missing file: the canonical empty root is returned, nothing is written.
//! - Unparseable file, or JSON that is not an object: handled by
//!   [`RecoveryPolicy`]. The default,
//!   `RecoverWithDefault`, logs and returns the empty root; the corrupt bytes
//!   stay on disk until the next save replaces them.
//! - Well-formed objects are always kept, with `null` or mistyped fields read
//!   leniently (see [`ContentNode`]).
//! - Legacy file (`folders` without `entries`): rewritten once into the
//!   current shape, with `folders` copied verbatim, and persisted before
//!   being returned. Loading the rewritten file is a plain read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ContentNode, ROOT_NAME};
use crate::storage::persistence::{decode_json, read_bytes, write_json};
use crate::storage::{PathLocks, StoreError, StoreResult};

/// What to do when the tree file exists but cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Treat the content as lost and return the empty root
    #[default]
    RecoverWithDefault,
    /// Return the decode error to the caller
    Surface,
}

/// How a tree load was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file yet; empty root returned
    Missing,
    /// File read as-is
    Loaded,
    /// File was corrupt; empty root returned
    Recovered,
    /// Legacy file rewritten to the current shape
    Migrated,
}

/// Store for the main content tree
#[derive(Debug, Clone)]
pub struct TreeStore {
    path: PathBuf,
    policy: RecoveryPolicy,
    locks: Arc<PathLocks>,
}

impl TreeStore {
    /// Create a tree store for the document at `path`
    pub fn new(path: impl Into<PathBuf>, locks: Arc<PathLocks>) -> Self {
        Self {
            path: path.into(),
            policy: RecoveryPolicy::default(),
            locks,
        }
    }

    /// Create a tree store at the configured location
    pub fn from_config(config: &Config, locks: Arc<PathLocks>) -> Self {
        Self::new(config.tree_path(), locks)
    }

    /// Replace the recovery policy
    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RecoveryPolicy {
        self.policy
    }

    /// Load the tree, migrating a legacy document if needed
    pub fn load(&self) -> StoreResult<ContentNode> {
        self.load_with_outcome().map(|(tree, _)| tree)
    }

    /// Load the tree and report how the load was satisfied
    pub fn load_with_outcome(&self) -> StoreResult<(ContentNode, LoadOutcome)> {
        let Some(raw) = self.read_raw()? else {
            debug!(path = %self.path.display(), "no tree yet, using empty root");
            return Ok((ContentNode::empty_root(), LoadOutcome::Missing));
        };

        let value = match raw {
            Ok(value) => value,
            Err(err) => return self.recover(err),
        };

        if is_legacy(&value) {
            return self.migrate();
        }

        match decode_node(&self.path, value) {
            Ok(tree) => Ok((tree, LoadOutcome::Loaded)),
            Err(err) => self.recover(err),
        }
    }

    /// Replace the stored tree in full
    pub fn save(&self, tree: &ContentNode) -> StoreResult<()> {
        self.locks
            .with_lock(&self.path, || write_json(&self.path, tree))
    }

    /// Read and parse the file; `None` when it does not exist
    fn read_raw(&self) -> StoreResult<Option<StoreResult<Value>>> {
        match read_bytes(&self.path) {
            Ok(bytes) => Ok(Some(decode_json(&self.path, &bytes))),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Rewrite a legacy document
    ///
    /// The file is re-read under the write lock, so a save that landed
    /// after the first read is never clobbered by the migration.
    fn migrate(&self) -> StoreResult<(ContentNode, LoadOutcome)> {
        self.locks.with_lock(&self.path, || {
            let value = match self.read_raw()? {
                Some(Ok(value)) => value,
                Some(Err(err)) => return self.recover(err),
                None => return Ok((ContentNode::empty_root(), LoadOutcome::Missing)),
            };

            if !is_legacy(&value) {
                return match decode_node(&self.path, value) {
                    Ok(tree) => Ok((tree, LoadOutcome::Loaded)),
                    Err(err) => self.recover(err),
                };
            }

            let migrated = legacy_root(&value);
            write_json(&self.path, &migrated)?;
            let tree = match decode_node(&self.path, migrated) {
                Ok(tree) => tree,
                Err(err) => return self.recover(err),
            };
            info!(
                path = %self.path.display(),
                folders = tree.folders.len(),
                "migrated legacy tree document"
            );
            Ok((tree, LoadOutcome::Migrated))
        })
    }

    fn recover(&self, err: StoreError) -> StoreResult<(ContentNode, LoadOutcome)> {
        match self.policy {
            RecoveryPolicy::RecoverWithDefault => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "tree document unreadable, starting from an empty root"
                );
                Ok((ContentNode::empty_root(), LoadOutcome::Recovered))
            }
            RecoveryPolicy::Surface => Err(err),
        }
    }
}

/// A document with `folders` but no `entries` predates entries support
fn is_legacy(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("folders") && !obj.contains_key("entries"))
        .unwrap_or(false)
}

/// Current-shape root around the legacy `folders`, which are kept verbatim
fn legacy_root(legacy: &Value) -> Value {
    json!({
        "name": ROOT_NAME,
        "cover": "",
        "folders": legacy.get("folders").cloned().unwrap_or(Value::Null),
        "entries": [],
    })
}

fn decode_node(path: &Path, value: Value) -> StoreResult<ContentNode> {
    serde_json::from_value(value).map_err(|source| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        source,
    })
}
