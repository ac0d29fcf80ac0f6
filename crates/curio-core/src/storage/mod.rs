//! Storage layer
//!
//! Shared plumbing for every store:
//!
//! - **error**: typed errors and their transport classification
//! - **persistence**: atomic JSON reads and writes
//! - **locks**: per-path mutexes that serialize concurrent writers

pub mod error;
pub mod locks;
pub mod persistence;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use locks::PathLocks;
