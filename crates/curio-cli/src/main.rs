//! Curio CLI
//!
//! Command-line interface for Curio - a personal content organizer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use curio_core::{Config, Library};

mod commands;
mod input;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "curio")]
#[command(about = "Curio - personal content organizer storage backend")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or replace the content tree
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },
    /// Show or replace the global settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Load, save or import session files
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Manage profile files
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Store and read cached images
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
    /// Check for new releases
    Changelog {
        /// Show the cached list without contacting the server
        #[arg(long)]
        cached: bool,
    },
    /// Send a raw request through the route table
    Request {
        /// HTTP method (GET or POST)
        method: String,
        /// Route path, e.g. /load or /IMG/cover.png
        path: String,
        /// JSON body file ("-" for stdin)
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum TreeCommands {
    /// Print the content tree
    Show,
    /// Replace the tree with a JSON document
    Save {
        /// JSON file ("-" for stdin)
        file: String,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the global settings
    Show,
    /// Replace the global settings with a JSON document
    Save {
        /// JSON file ("-" for stdin)
        file: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Print a session (defaults to the active profile)
    Load {
        /// Session path, relative to the data directory
        path: Option<String>,
    },
    /// Write a session document
    Save {
        /// Session path, relative to the data directory
        path: String,
        /// JSON file ("-" for stdin)
        file: String,
    },
    /// Import a JSON file as a new session
    Import {
        /// JSON file ("-" for stdin)
        file: String,
        /// Destination path (defaults to Profiles/imported_<time>_<name>)
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List profiles from the global settings
    #[command(alias = "ls")]
    List,
    /// Write a profile's session file
    Save {
        /// Profile name
        name: String,
        /// JSON file ("-" for stdin)
        file: String,
    },
    /// Rename a profile's session file
    Rename {
        /// Current profile name
        old: String,
        /// New profile name
        new: String,
    },
}

#[derive(Subcommand)]
enum ImageCommands {
    /// Store an image file
    Add {
        /// Image file to store
        file: PathBuf,
        /// Name to store it under (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Write a stored image to stdout or a file
    Cat {
        /// Stored file name, e.g. cover.png
        filename: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, changelog_url, fetch_timeout_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the library
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);
    debug!(data_dir = %config.data_dir.display(), "opening library");

    let library = Library::open_with_config(config).context("Failed to open library")?;

    match cli.command {
        Commands::Tree { command } => match command {
            TreeCommands::Show => commands::tree::show(&library, &output),
            TreeCommands::Save { file } => commands::tree::save(&library, file, &output),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show => commands::settings::show(&library, &output),
            SettingsCommands::Save { file } => commands::settings::save(&library, file, &output),
        },
        Commands::Session { command } => handle_session_command(command, &library, &output),
        Commands::Profile { command } => handle_profile_command(command, &library, &output),
        Commands::Image { command } => match command {
            ImageCommands::Add { file, name } => commands::image::add(&library, file, name, &output),
            ImageCommands::Cat { filename, out } => {
                commands::image::cat(&library, filename, out, &output)
            }
        },
        Commands::Changelog { cached } => commands::changelog::show(&library, cached, &output),
        Commands::Request { method, path, body } => {
            commands::request::run(&library, method, path, body, &output)
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_session_command(command: SessionCommands, library: &Library, output: &Output) -> Result<()> {
    match command {
        SessionCommands::Load { path } => commands::session::load(library, path, output),
        SessionCommands::Save { path, file } => commands::session::save(library, path, file, output),
        SessionCommands::Import { file, path } => {
            commands::session::import(library, path, file, output)
        }
    }
}

fn handle_profile_command(command: ProfileCommands, library: &Library, output: &Output) -> Result<()> {
    match command {
        ProfileCommands::List => commands::profile::list(library, output),
        ProfileCommands::Save { name, file } => commands::profile::save(library, name, file, output),
        ProfileCommands::Rename { old, new } => {
            commands::profile::rename(library, old, new, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
