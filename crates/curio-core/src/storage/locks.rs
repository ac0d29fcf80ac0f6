//! Per-path write locks
//!
//! Serializes writers that target the same file. Every store created by one
//! `Library` shares a single registry, so a tree save and a session save to
//! the same resolved path still queue behind each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of one mutex per resolved path
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `path`
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        self.with_locks(&[path], f)
    }

    /// Run `f` while holding the locks for every path in `paths`
    ///
    /// Locks are taken in sorted order, so two callers locking the same pair
    /// in opposite argument order cannot deadlock.
    pub fn with_locks<T>(&self, paths: &[&Path], f: impl FnOnce() -> T) -> T {
        let mut keys: Vec<PathBuf> = paths.iter().map(|p| lock_key(p)).collect();
        keys.sort();
        keys.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = keys.iter().map(|k| self.entry(k)).collect();
        let _guards: Vec<MutexGuard<'_, ()>> = mutexes
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        f()
    }

    /// Number of distinct paths seen so far
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &Path) -> Arc<Mutex<()>> {
        self.registry()
            .entry(key.to_path_buf())
            .or_default()
            .clone()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Absolute form of `path`, so `./a.json` and `/cwd/a.json` share a lock
fn lock_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
