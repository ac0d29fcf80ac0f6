//! Command handlers, one module per subcommand group

pub mod changelog;
pub mod config;
pub mod image;
pub mod profile;
pub mod request;
pub mod session;
pub mod settings;
pub mod tree;
