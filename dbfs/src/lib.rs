//! DBFS - SQL Server DMVs as a file tree
//!
//! This library builds the on-disk dump tree that the DBFS filesystem layer
//! serves under its mount point. For every configured server it creates a
//! directory holding one placeholder file per dynamic management view (DMV)
//! plus a `customQueries` folder for user supplied queries. Every synthesized
//! file carries a provenance mark so the serving layer can tell placeholders
//! apart from files holding real query output.
//!
//! # Layout
//!
//! ```text
//! <dump root>/
//! └── <server>/
//!     ├── dm_exec_requests
//!     ├── dm_exec_requests.json     (version >= 16)
//!     └── customQueries/
//!         └── <query file name>
//! ```

pub mod app;
pub mod catalog;
pub mod config;
pub mod fatal;
pub mod logging;
pub mod materializer;
pub mod paths;
pub mod provenance;
pub mod registry;

/// Crate version, reported by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
