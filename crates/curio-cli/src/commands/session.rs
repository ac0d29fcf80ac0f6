//! Session command handlers

use anyhow::{bail, Context, Result};

use curio_core::api::{self, Request, SaveJsonSessionRequest};
use curio_core::Library;

use crate::input;
use crate::output::Output;

/// Load a session, defaulting to the active profile's file
pub fn load(library: &Library, path: Option<String>, output: &Output) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => active_session_path(library)?,
    };

    let session = library
        .documents()
        .load(&path)
        .with_context(|| format!("Failed to load session {:?}", path))?;
    output.print_document(&session);
    Ok(())
}

/// Write a session document
pub fn save(library: &Library, path: String, source: String, output: &Output) -> Result<()> {
    let data = input::read_json(&source)?;
    let written = library
        .documents()
        .save(&path, &data)
        .with_context(|| format!("Failed to save session {:?}", path))?;
    output.success(&format!("Saved session to {}", written.display()));
    Ok(())
}

/// Import a JSON file as a new session
///
/// Without `--path`, the file lands in the profiles directory under an
/// `imported_` name.
pub fn import(
    library: &Library,
    path: Option<String>,
    source: String,
    output: &Output,
) -> Result<()> {
    let data = input::read_json(&source)?;
    let file_name = std::path::Path::new(&source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|_| source != "-");

    let reply = api::handle(
        library,
        Request::SaveJsonSession(SaveJsonSessionRequest {
            session_path: path,
            data,
            file_name,
        }),
    );

    let body = reply.json().cloned().unwrap_or_default();
    if !reply.is_success() {
        bail!(
            "Import failed: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }
    output.success(body["message"].as_str().unwrap_or("Imported session"));
    Ok(())
}

fn active_session_path(library: &Library) -> Result<String> {
    let settings = library
        .settings()
        .load_view()
        .context("No session path given and global settings are unavailable")?;

    match settings.active_profile() {
        Some(profile) if !profile.value.is_empty() => Ok(profile.value.clone()),
        Some(profile) => bail!("Active profile '{}' has no session file", profile.name),
        None => bail!("No session path given and no active profile is set"),
    }
}
