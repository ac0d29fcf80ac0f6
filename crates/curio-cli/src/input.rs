//! Reading command input
//!
//! JSON documents come from a file or from stdin (`-`); images are read from
//! disk and wrapped into the data-URL form the asset store ingests.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// Read a JSON document from `source`, or stdin when it is `-`
pub fn read_json(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read JSON from stdin")?;
        buf
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read {:?}", source))?
    };

    serde_json::from_str(&text).with_context(|| format!("{:?} is not valid JSON", source))
}

/// Read an image file as a `data:` URL
pub fn read_image_data_url(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read image {:?}", path))?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for_path(path),
        STANDARD.encode(bytes)
    ))
}

/// MIME type guessed from a file extension
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// File stem used as the suggested asset name
pub fn suggested_name(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, r#"{"name": "Root"}"#).unwrap();

        let value = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(value["name"], "Root");
    }

    #[test]
    fn test_read_json_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{").unwrap();

        let err = read_json(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_image_data_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Cover.PNG");
        fs::write(&path, b"abc").unwrap();

        let url = read_image_data_url(&path).unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
        assert_eq!(suggested_name(&path).as_deref(), Some("Cover"));
    }

    #[test]
    fn test_unknown_extension_has_no_image_hint() {
        assert_eq!(mime_for_path(Path::new("x.bmp")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("x.jpeg")), "image/jpeg");
    }
}
