//! sk - lifecycle manager for agent skill packages.
//!
//! Installs markdown skill definitions from a registry or directly from
//! GitHub, with security scanning, backups, three-way merge updates, and a
//! local version/advisory history.

pub mod app;
pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod installer;
pub mod manifest;
pub mod merge;
pub mod optimize;
pub mod registry;
pub mod resolver;
pub mod security;
pub mod utils;
pub mod validate;

pub use error::{Result, SkError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
