//! Settings command handlers

use anyhow::{Context, Result};

use curio_core::Library;

use crate::input;
use crate::output::Output;

/// Show the global settings
pub fn show(library: &Library, output: &Output) -> Result<()> {
    let settings = library.settings().load().map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!("No global settings saved yet")
        } else {
            anyhow::Error::new(e).context("Failed to load global settings")
        }
    })?;
    output.print_document(&settings);
    Ok(())
}

/// Replace the global settings
pub fn save(library: &Library, source: String, output: &Output) -> Result<()> {
    let settings = input::read_json(&source)?;
    library
        .settings()
        .save(&settings)
        .context("Failed to save global settings")?;
    output.success(&format!(
        "Saved global settings to {}",
        library.settings().path().display()
    ));
    Ok(())
}
