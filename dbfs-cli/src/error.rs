//! CLI error type.

use dbfs::config::ConfigError;
use dbfs::fatal::FatalError;
use dbfs::logging::LoggingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}
