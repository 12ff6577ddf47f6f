//! Startup orchestration.
//!
//! [`DbfsApp`] owns the pieces needed to build the dump tree (settings,
//! sealed registry, dump root, provenance tagger) and materializes every
//! configured server in turn.
//!
//! # Example
//!
//! ```ignore
//! use dbfs::app::DbfsApp;
//! use dbfs::catalog::SqlcmdClient;
//!
//! let app = DbfsApp::new(settings, registry)?;
//! let summary = app.bootstrap(&SqlcmdClient::new())?;
//! println!("{} placeholder files", summary.total_files());
//! ```

mod bootstrap;
mod summary;

pub use bootstrap::DbfsApp;
pub use summary::BootstrapSummary;
