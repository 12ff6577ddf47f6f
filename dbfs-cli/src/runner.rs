//! Shared setup for CLI commands.

use std::path::PathBuf;

use dbfs::config::{default_config_path, ConfigFile, Settings};
use dbfs::logging::{self, LogGuard};
use dbfs::registry::ServerRegistry;
use tracing::info;

use crate::error::CliError;
use crate::GlobalArgs;

/// Resolved settings plus the logging guard for one command.
pub struct CliRunner {
    settings: Settings,
    config_path: PathBuf,
    _log_guard: LogGuard,
}

impl CliRunner {
    /// Resolve settings from arguments and install logging.
    pub fn new(args: &GlobalArgs) -> Result<Self, CliError> {
        let settings = settings_from_args(args);
        let log_guard = logging::init(settings.verbose, settings.log_file.as_deref())?;
        Ok(Self {
            settings,
            config_path: args.config.clone().unwrap_or_else(default_config_path),
            _log_guard: log_guard,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load and seal the server registry.
    pub fn load_registry(&self) -> Result<ServerRegistry, CliError> {
        Ok(ConfigFile::load(&self.config_path)?)
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = dbfs::VERSION,
            command,
            config = %self.config_path.display(),
            dump_dir = %self.settings.dump_dir.display(),
            "DBFS starting"
        );
    }
}

fn settings_from_args(args: &GlobalArgs) -> Settings {
    let mut settings = match &args.dump_dir {
        Some(dir) => Settings::new(dir),
        None => Settings::default(),
    }
    .with_verbose(args.verbose)
    .with_provenance(args.provenance.into());

    if let Some(mount_dir) = &args.mount_dir {
        settings = settings.with_mount_dir(mount_dir);
    }
    if let Some(log_file) = &args.log_file {
        settings = settings.with_log_file(log_file);
    }
    settings
}
