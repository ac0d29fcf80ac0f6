//! Logging setup
//!
//! Logs go to stderr, or to `log_file` when one is configured. The level
//! comes from CURIO_LOG when set, otherwise `warn` (`debug` with -v).

use std::fs::OpenOptions;
use std::sync::Mutex;

use curio_core::Config;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an explicit filter directive
const LOG_ENV: &str = "CURIO_LOG";

/// Install the global subscriber (ignored if one is already installed)
pub fn init(config: &Config, verbose: bool) {
    let env_filter = filter(std::env::var(LOG_ENV).ok(), verbose);

    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

fn filter(directive: Option<String>, verbose: bool) -> EnvFilter {
    match directive.filter(|d| !d.trim().is_empty()) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::new(default_directive(verbose)),
    }
}

fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "warn" };
    format!("curio_core={},curio_cli={}", level, level)
}
