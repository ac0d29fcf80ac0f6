//! Profile command handlers
//!
//! Profiles are addressed by name and stored as `Profiles/<name>.json`
//! under the data directory.

use anyhow::{Context, Result};

use curio_core::Library;

use crate::input;
use crate::output::{Output, OutputFormat};

/// List the profiles recorded in the global settings
pub fn list(library: &Library, output: &Output) -> Result<()> {
    let settings = library
        .settings()
        .load_view()
        .context("Failed to read profiles from global settings")?;
    let active = settings.active_session.as_deref();

    match output.format {
        OutputFormat::Human => {
            if settings.profiles.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }
            for profile in &settings.profiles {
                let marker = if Some(profile.name.as_str()) == active {
                    "*"
                } else {
                    " "
                };
                let exists = library.documents().exists(&profile.value);
                println!(
                    "{} {} -> {}{}",
                    marker,
                    profile.name,
                    profile.value,
                    if exists { "" } else { " (missing)" }
                );
            }
            println!("\n{} profile(s)", settings.profiles.len());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "profiles": settings.profiles,
                    "activeSession": active,
                }))?
            );
        }
        OutputFormat::Quiet => {
            for profile in &settings.profiles {
                println!("{}", profile.name);
            }
        }
    }
    Ok(())
}

/// Write a profile's session file
pub fn save(library: &Library, name: String, source: String, output: &Output) -> Result<()> {
    let data = input::read_json(&source)?;
    let path = library.config().profile_path(&name);
    library
        .documents()
        .save(&path, &data)
        .with_context(|| format!("Failed to save profile '{}'", name))?;
    output.success(&format!("Saved profile '{}' to {}", name, path.display()));
    Ok(())
}

/// Rename a profile's session file
pub fn rename(library: &Library, old: String, new: String, output: &Output) -> Result<()> {
    let from = library.config().profile_path(&old);
    let to = library.config().profile_path(&new);
    library
        .documents()
        .rename(&from, &to)
        .with_context(|| format!("Failed to rename profile '{}' to '{}'", old, new))?;
    output.success(&format!("Renamed profile '{}' to '{}'", old, new));
    output.message("Remember to update the profile entry in the global settings.");
    Ok(())
}
