//! Raw request command
//!
//! Runs one route through the same request/reply boundary a server would
//! use, and prints the status and body.

use std::io::Write;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use curio_core::api;
use curio_core::{Library, ReplyBody};

use crate::input;
use crate::output::Output;

/// Dispatch `method path` with an optional JSON body
pub fn run(
    library: &Library,
    method: String,
    path: String,
    body: Option<String>,
    output: &Output,
) -> Result<()> {
    let body = match body {
        Some(source) => input::read_json(&source)?,
        None => Value::Null,
    };

    let reply = api::dispatch(library, &method, &path, body);

    match &reply.body {
        ReplyBody::Json(value) => {
            if output.is_json() || output.is_quiet() {
                println!("{}", value);
            } else {
                println!("{} {}", reply.status, status_text(reply.status));
                println!("{}", serde_json::to_string_pretty(value)?);
            }
        }
        ReplyBody::Binary {
            content_type,
            bytes,
        } => {
            if output.is_json() || output.is_quiet() {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(bytes).context("Failed to write body")?;
                stdout.flush()?;
            } else {
                println!("{} {}", reply.status, status_text(reply.status));
                println!("{} ({} bytes)", content_type, bytes.len());
            }
        }
    }

    if !reply.is_success() {
        bail!("{} {} returned {}", method, path, reply.status);
    }
    Ok(())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}
