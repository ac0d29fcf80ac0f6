//! Image command handlers

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use curio_core::Library;

use crate::input;
use crate::output::Output;

/// Ingest an image file into the asset directory
pub fn add(library: &Library, file: PathBuf, name: Option<String>, output: &Output) -> Result<()> {
    let payload = input::read_image_data_url(&file)?;
    let name = name.or_else(|| input::suggested_name(&file));

    let record = library
        .assets()
        .ingest(&payload, name.as_deref())
        .context("Failed to store image")?;
    output.print_asset(&record);
    Ok(())
}

/// Write a stored image to a file or stdout
pub fn cat(library: &Library, filename: String, out: Option<PathBuf>, output: &Output) -> Result<()> {
    let bytes = library
        .assets()
        .serve(&filename)
        .with_context(|| format!("Image '{}' not found", filename))?;

    match out {
        Some(path) => {
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {:?}", path))?;
            output.success(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write image")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
