//! Image asset store
//!
//! Ingests data-URL encoded images into the asset directory (`IMG/`).
//!
//! File names come from the caller's suggestion, sanitized so they cannot
//! leave the directory. Collisions are resolved by a deterministic linear
//! probe: `name.ext`, `name_1.ext`, `name_2.ext`, ... Identical uploads are
//! never deduplicated; every ingest produces a new file.

use std::fs::OpenOptions;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::config::{Config, ASSET_DIR_NAME};
use crate::models::AssetRecord;
use crate::storage::persistence::{atomic_write, ensure_dir, read_bytes};
use crate::storage::{PathLocks, StoreError, StoreResult};

/// Name used when the caller suggests nothing usable
pub const DEFAULT_ASSET_NAME: &str = "image";

/// Extension used for unknown or missing type hints
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Longest sanitized stem, in characters
const MAX_NAME_CHARS: usize = 120;

/// Hint substrings and their extensions, in priority order
const EXTENSION_HINTS: &[(&str, &str)] = &[
    ("jpeg", ".jpg"),
    ("jpg", ".jpg"),
    ("png", ".png"),
    ("gif", ".gif"),
    ("webp", ".webp"),
];

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// An encoded image split into its type hint and base64 body
///
/// `data:image/png;base64,iVBOR...` has the hint `data:image/png;base64`.
/// A payload without a comma is all body and has no hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    pub hint: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> ImagePayload<'a> {
    pub fn parse(payload: &'a str) -> Self {
        match payload.split_once(',') {
            Some((hint, body)) => Self {
                hint: Some(hint),
                body,
            },
            None => Self {
                hint: None,
                body: payload,
            },
        }
    }

    /// Extension inferred from the hint
    pub fn extension(&self) -> &'static str {
        extension_for_hint(self.hint)
    }

    /// Decode the base64 body; padding and embedded whitespace are optional
    pub fn decode(&self) -> StoreResult<Vec<u8>> {
        let compact: String = self
            .body
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let unpadded = compact.trim_end_matches('=');
        if unpadded.is_empty() {
            return Err(StoreError::InvalidPayload {
                details: "image data is empty".to_string(),
            });
        }
        STANDARD_NO_PAD
            .decode(unpadded)
            .map_err(|e| StoreError::InvalidPayload {
                details: e.to_string(),
            })
    }
}

/// Map a type hint to a file extension; unknown hints fall back to `.jpg`
pub fn extension_for_hint(hint: Option<&str>) -> &'static str {
    let Some(hint) = hint else {
        return DEFAULT_EXTENSION;
    };
    let hint = hint.to_ascii_lowercase();
    EXTENSION_HINTS
        .iter()
        .find(|(needle, _)| hint.contains(needle))
        .map(|(_, ext)| *ext)
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Turn a suggested name into a safe file stem
///
/// Path separators become `_`, anything outside alphanumerics, `-`, `_`
/// and `.` is dropped (whitespace becomes `_`), and surrounding dots and
/// underscores are trimmed. A trailing image extension is removed since the
/// real one is appended from the payload.
pub fn sanitize_name(suggested: &str) -> String {
    let mut safe = String::with_capacity(suggested.len());
    for c in suggested.chars() {
        match c {
            '/' | '\\' => safe.push('_'),
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => safe.push(c),
            c if c.is_whitespace() => safe.push('_'),
            _ => {}
        }
    }

    let stem = strip_image_extension(&safe);
    let trimmed = stem.trim_matches(|c| c == '.' || c == '_');
    let capped: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    let mut name = capped.trim_end_matches(|c| c == '.' || c == '_').to_string();

    if name.is_empty() {
        return DEFAULT_ASSET_NAME.to_string();
    }
    if is_windows_device_name(&name) {
        name.insert(0, '_');
    }
    name
}

fn strip_image_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    [".jpeg", ".jpg", ".png", ".gif", ".webp"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &name[..name.len() - ext.len()])
        .unwrap_or(name)
}

fn is_windows_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_uppercase();
    WINDOWS_DEVICE_NAMES.contains(&stem.as_str())
}

/// MIME type for a stored asset, from its extension
pub fn content_type(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    match Path::new(&lower).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Store for ingested images
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    locks: Arc<PathLocks>,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>, locks: Arc<PathLocks>) -> Self {
        Self {
            dir: dir.into(),
            locks,
        }
    }

    /// Create an asset store at the configured directory
    pub fn from_config(config: &Config, locks: Arc<PathLocks>) -> Self {
        Self::new(config.assets_dir(), locks)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode `payload` and store it under a unique name
    ///
    /// The returned record names the file; the bytes are not retained.
    pub fn ingest(&self, payload: &str, suggested_name: Option<&str>) -> StoreResult<AssetRecord> {
        let payload = ImagePayload::parse(payload);
        let extension = payload.extension();
        let bytes = payload.decode()?;
        let stem = sanitize_name(suggested_name.unwrap_or(DEFAULT_ASSET_NAME));

        ensure_dir(&self.dir)?;

        let filename = self.locks.with_lock(&self.dir, || {
            let filename = self.reserve(&stem, extension)?;
            let target = self.dir.join(&filename);
            if let Err(err) = atomic_write(&target, &bytes) {
                self.release(&target);
                return Err(err);
            }
            Ok(filename)
        })?;

        info!(
            filename = %filename,
            bytes = bytes.len(),
            "stored image asset"
        );

        Ok(AssetRecord {
            path: format!("{}/{}", self.public_prefix(), filename),
            filename,
            extension: extension.to_string(),
        })
    }

    /// Read a stored asset
    ///
    /// `filename` must name a file directly inside the asset directory;
    /// anything that would resolve elsewhere is reported as `NotFound`.
    pub fn serve(&self, filename: &str) -> StoreResult<Vec<u8>> {
        let path = self.resolve(filename)?;
        if !path.is_file() {
            return Err(StoreError::NotFound { path });
        }
        read_bytes(&path)
    }

    /// Check whether an asset exists
    pub fn contains(&self, filename: &str) -> bool {
        self.resolve(filename).map(|p| p.is_file()).unwrap_or(false)
    }

    fn resolve(&self, filename: &str) -> StoreResult<PathBuf> {
        let candidate = Path::new(filename);
        let mut components = candidate.components();
        let single_plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );

        if !single_plain || filename.contains(['/', '\\']) {
            debug!(filename, "rejected asset name outside the asset directory");
            return Err(StoreError::NotFound {
                path: self.dir.join(filename.replace(['/', '\\'], "_")),
            });
        }
        Ok(self.dir.join(candidate))
    }

    /// Claim the first free name in the probe sequence
    ///
    /// The name is claimed by creating an empty file with create-new
    /// semantics, so a racing writer in another process cannot take it.
    fn reserve(&self, stem: &str, extension: &str) -> StoreResult<String> {
        let mut attempt: u64 = 0;
        loop {
            let filename = if attempt == 0 {
                format!("{}{}", stem, extension)
            } else {
                format!("{}_{}{}", stem, attempt, extension)
            };
            let path = self.dir.join(&filename);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(filename),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(filename = %filename, "asset name taken, probing next");
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::from_write(e, path)),
            }
        }
    }

    /// Give a reserved name back after a failed write
    fn release(&self, target: &Path) {
        if let Err(err) = std::fs::remove_file(target) {
            warn!(
                path = %target.display(),
                error = %err,
                "could not release reserved asset name"
            );
        }
    }

    /// Relative prefix for returned paths
    fn public_prefix(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ASSET_DIR_NAME.to_string())
    }
}
