//! Fatal failures and the teardown supervisor.
//!
//! Some startup failures leave nothing sensible to do: the server root
//! directory cannot be created, the provenance mark cannot be set, or a
//! server name is unknown. These surface as [`FatalError`] and travel up to
//! a [`Supervisor`], which runs the registered teardown hooks (unmount,
//! dump cleanup) before the process exits.
//!
//! # Example
//!
//! ```
//! use dbfs::fatal::{FatalError, Supervisor};
//!
//! let mut supervisor = Supervisor::new();
//! supervisor.on_teardown("cleanup", || println!("tearing down"));
//!
//! let result: Result<(), FatalError> = supervisor.run(|| {
//!     Err(FatalError::UnknownServer { name: "ghost".into() })
//! });
//! assert!(result.is_err());
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::provenance::AttributeError;

/// A failure that must end the process.
#[derive(Debug, Error)]
pub enum FatalError {
    /// A directory the whole tree depends on could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    Structural {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The provenance mark could not be set.
    #[error("failed to set provenance mark on {}: {source}", path.display())]
    Attribute {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A server name with no configuration entry.
    #[error("unknown server {name}")]
    UnknownServer { name: String },
}

impl From<AttributeError> for FatalError {
    fn from(e: AttributeError) -> Self {
        FatalError::Attribute {
            path: e.path,
            source: e.source,
        }
    }
}

/// Report a fatal failure and hand it back for propagation.
///
/// Callers return the result straight away: `return Err(escalate(err))`.
pub fn escalate(err: impl Into<FatalError>) -> FatalError {
    let err = err.into();
    error!(error = %err, "Fatal error, shutting down");
    err
}

type Hook = Box<dyn FnOnce() + Send>;

/// Runs bootstrap work and owns teardown on fatal failure.
#[derive(Default)]
pub struct Supervisor {
    hooks: Vec<(String, Hook)>,
}

impl Supervisor {
    /// Create a supervisor with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a teardown hook. Hooks run in reverse registration order.
    pub fn on_teardown(&mut self, name: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    /// Number of hooks still pending.
    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    /// Run `work`. On a fatal error every hook runs before the error is
    /// returned; on success the hooks stay registered.
    pub fn run<T>(
        &mut self,
        work: impl FnOnce() -> Result<T, FatalError>,
    ) -> Result<T, FatalError> {
        match work() {
            Ok(value) => Ok(value),
            Err(err) => {
                error!(error = %err, "Bootstrap aborted, running teardown");
                self.teardown();
                Err(err)
            }
        }
    }

    /// Run all pending hooks for a normal exit.
    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.teardown();
    }

    fn teardown(&mut self) {
        while let Some((name, hook)) = self.hooks.pop() {
            info!(hook = %name, "Running teardown hook");
            hook();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Supervisor").field("hooks", &names).finish()
    }
}
