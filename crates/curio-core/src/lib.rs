//! Curio Core Library
//!
//! This crate provides the persistence backend for Curio, a personal
//! content organizer: a tree of named folders and entries, plus global
//! settings, session and profile snapshots, an image cache and a cached list
//! of release notes.
//!
//! # Architecture
//!
//! - **JSON files** are the source of truth; every write goes through a temp
//!   file and an atomic rename.
//! - **Per-path locks** serialize concurrent writers to the same file.
//! - **Typed errors** are classified into four kinds and turned into status
//!   codes only at the `api` boundary.
//!
//! # Quick Start
//!
//! ```text
//! let library = Library::open()?;
//!
//! let tree = library.tree().load()?;
//! let record = library.assets().ingest("data:image/png;base64,...", Some("cover"))?;
//! let changelog = library.changelog().refresh()?;
//! ```
//!
//! # Modules
//!
//! - `library`: Unified entry point holding every store
//! - `tree`: Main content tree with legacy migration
//! - `documents`: Path-addressed sessions and profiles
//! - `settings`: Global settings document
//! - `assets`: Image ingestion and serving
//! - `changelog`: Remote release list with local cache
//! - `api`: Route decoding and status-code mapping
//! - `models`: Data structures
//! - `storage`: Errors, atomic writes, path locks
//! - `config`: Application configuration

pub mod api;
pub mod assets;
pub mod changelog;
pub mod config;
pub mod documents;
pub mod library;
pub mod models;
pub mod settings;
pub mod storage;
pub mod tree;

pub use api::{Reply, ReplyBody, Request};
pub use assets::AssetStore;
pub use changelog::{ChangelogCache, ChangelogRefresh, HttpReleaseSource, ReleaseSource};
pub use config::Config;
pub use documents::DocumentStore;
pub use library::Library;
pub use models::{AssetRecord, ChangelogEntry, ContentNode, Entry, GlobalSettings, Profile};
pub use settings::SettingsStore;
pub use storage::{ErrorKind, PathLocks, StoreError, StoreResult};
pub use tree::{LoadOutcome, RecoveryPolicy, TreeStore};
