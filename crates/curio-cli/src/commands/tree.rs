//! Tree command handlers

use anyhow::{Context, Result};

use curio_core::{ContentNode, Library};

use crate::input;
use crate::output::Output;

/// Show the content tree
pub fn show(library: &Library, output: &Output) -> Result<()> {
    let tree = library.tree().load().context("Failed to load tree")?;
    output.print_tree(&tree);
    Ok(())
}

/// Replace the content tree with a JSON document
pub fn save(library: &Library, source: String, output: &Output) -> Result<()> {
    let value = input::read_json(&source)?;
    let tree: ContentNode =
        serde_json::from_value(value).context("Document is not a valid content tree")?;

    library.tree().save(&tree).context("Failed to save tree")?;

    output.success(&format!(
        "Saved tree ({} folder(s), {} entries)",
        tree.folder_count(),
        tree.entry_count()
    ));
    Ok(())
}
