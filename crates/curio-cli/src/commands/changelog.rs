//! Changelog command handler

use anyhow::{Context, Result};

use curio_core::{ChangelogRefresh, Library};

use crate::output::Output;

/// Refresh (or with `cached`, just show) the release changelog
pub fn show(library: &Library, cached: bool, output: &Output) -> Result<()> {
    let refresh = if cached {
        let entries = library
            .changelog()
            .cached()
            .context("No cached changelog available")?;
        ChangelogRefresh {
            entries,
            new_release: false,
        }
    } else {
        library.changelog().refresh().with_context(|| {
            format!(
                "Failed to fetch changelog from {}",
                library.changelog().source_location()
            )
        })?
    };

    output.print_changelog(&refresh);
    Ok(())
}
