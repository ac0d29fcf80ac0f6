//! JSON file persistence
//!
//! Handles saving and loading JSON documents to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) so a crash never
//! leaves a truncated document behind.
//!
//! Documents are written pretty-printed with two-space indentation and
//! non-ASCII characters left unescaped.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::error::{StoreError, StoreResult};

/// Create `dir` and all missing parents
pub(crate) fn ensure_dir(dir: &Path) -> StoreResult<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Create the parent directory of `path` if it is missing
pub(crate) fn ensure_parent(path: &Path) -> StoreResult<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Temp file used while writing `path`, in the same directory so the final
/// rename never crosses a filesystem boundary
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(".{}.{}.tmp", name, Uuid::new_v4().simple());
    match path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// Missing parent directories are created first.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    ensure_parent(path)?;

    let temp_path = temp_path_for(path);
    let result = write_and_sync(&temp_path, data).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|source| StoreError::RenameFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        if let Err(err) = fs::remove_file(&temp_path) {
            debug!(path = %temp_path.display(), error = %err, "temp file not removed");
        }
    }
    result
}

fn write_and_sync(temp_path: &Path, data: &[u8]) -> StoreResult<()> {
    let mut file =
        File::create(temp_path).map_err(|e| StoreError::from_write(e, temp_path.to_path_buf()))?;
    file.write_all(data)
        .map_err(|e| StoreError::from_write(e, temp_path.to_path_buf()))?;
    file.sync_all()
        .map_err(|e| StoreError::from_write(e, temp_path.to_path_buf()))
}

/// Read a whole file
pub(crate) fn read_bytes(path: &Path) -> StoreResult<Vec<u8>> {
    fs::read(path).map_err(|e| StoreError::from_read(e, path.to_path_buf()))
}

/// Parse raw bytes read from `path`
pub(crate) fn decode_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse a JSON document
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let bytes = read_bytes(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read document");
    decode_json(path, &bytes)
}

/// Serialize and atomically write a JSON document
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote document");
    Ok(())
}
