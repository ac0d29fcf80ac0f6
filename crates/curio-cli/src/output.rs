//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use curio_core::{AssetRecord, ChangelogRefresh, ContentNode};
use serde::Serialize;
use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print an opaque document
    ///
    /// Documents are JSON in every mode; quiet mode prints them compact.
    pub fn print_document(&self, document: &Value) {
        match self.format {
            OutputFormat::Quiet => println!("{}", document),
            _ => println!("{}", pretty(document)),
        }
    }

    /// Print the content tree
    pub fn print_tree(&self, tree: &ContentNode) {
        match self.format {
            OutputFormat::Human => {
                for line in outline(tree) {
                    println!("{}", line);
                }
                println!();
                println!(
                    "{} folder(s), {} entr{}",
                    tree.folder_count(),
                    tree.entry_count(),
                    if tree.entry_count() == 1 { "y" } else { "ies" }
                );
            }
            OutputFormat::Json => println!("{}", pretty(tree)),
            OutputFormat::Quiet => println!("{}", tree.entry_count()),
        }
    }

    /// Print the result of an image ingest
    pub fn print_asset(&self, record: &AssetRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Stored image");
                println!("  File: {}", record.filename);
                println!("  Path: {}", record.path);
            }
            OutputFormat::Json => println!("{}", pretty(record)),
            OutputFormat::Quiet => println!("{}", record.path),
        }
    }

    /// Print a changelog refresh
    pub fn print_changelog(&self, refresh: &ChangelogRefresh) {
        match self.format {
            OutputFormat::Human => {
                if refresh.entries.is_empty() {
                    println!("No releases found.");
                    return;
                }
                if refresh.new_release {
                    println!("★ New release available");
                    println!();
                }
                for entry in &refresh.entries {
                    let date = entry
                        .published_at_utc()
                        .map(|ts| ts.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "unknown date".to_string());
                    println!(
                        "{} | {}",
                        date,
                        truncate(entry.title().unwrap_or("(untitled)"), 60)
                    );
                }
                println!("\n{} release(s)", refresh.entries.len());
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    pretty(&serde_json::json!({
                        "status": "success",
                        "data": refresh.entries,
                        "new_release": refresh.new_release,
                    }))
                );
            }
            OutputFormat::Quiet => println!("{}", refresh.new_release),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}

/// Indented outline of the tree, one folder per line
fn outline(tree: &ContentNode) -> Vec<String> {
    let mut lines = Vec::new();
    push_outline(tree, 0, &mut lines);
    lines
}

fn push_outline(node: &ContentNode, depth: usize, lines: &mut Vec<String>) {
    let entries = if node.entries.is_empty() {
        String::new()
    } else {
        format!(" [{}]", node.entries.len())
    };
    lines.push(format!(
        "{}{}{}",
        "  ".repeat(depth),
        truncate(&node.name, 50),
        entries
    ));
    for folder in &node.folders {
        push_outline(folder, depth + 1, lines);
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
