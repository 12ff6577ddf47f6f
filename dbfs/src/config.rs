//! Configuration file and runtime settings.
//!
//! The configuration file is INI formatted with one section per server:
//!
//! ```ini
//! [prod]
//! hostname = 10.0.0.4
//! username = sa
//! password = secret
//! version = 16
//! customQueriesPath = /home/dba/queries
//! ```
//!
//! `customQueriesPath` is optional; every other key is required.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;
use tracing::debug;

use crate::registry::{RegistryError, ServerRecord, ServerRegistry};

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("server {server} is missing required key '{key}'")]
    MissingKey { server: String, key: &'static str },

    #[error("server {server} has invalid version '{value}'")]
    InvalidVersion { server: String, value: String },

    #[error(transparent)]
    Duplicate(#[from] RegistryError),

    #[error("no servers configured")]
    NoServers,
}

/// Loader for the server configuration file.
pub struct ConfigFile;

impl ConfigFile {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<ServerRegistry, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse configuration text into a sealed registry.
    pub fn parse(text: &str) -> Result<ServerRegistry, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        let mut builder = ServerRegistry::builder();

        for (section, properties) in ini.iter() {
            let Some(name) = section else {
                continue;
            };
            let record = parse_server(name, properties)?;
            debug!(
                server = %record.name,
                hostname = %record.hostname,
                version = record.version,
                "Server configured"
            );
            builder.insert(record)?;
        }

        let registry = builder.seal();
        if registry.is_empty() {
            return Err(ConfigError::NoServers);
        }
        Ok(registry)
    }
}

fn required<'a>(
    server: &str,
    properties: &'a Properties,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    properties
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            server: server.to_string(),
            key,
        })
}

fn parse_server(name: &str, properties: &Properties) -> Result<ServerRecord, ConfigError> {
    let hostname = required(name, properties, "hostname")?;
    let username = required(name, properties, "username")?;
    let password = required(name, properties, "password")?;
    let version_text = required(name, properties, "version")?;
    let version = u32::from_str(version_text).map_err(|_| ConfigError::InvalidVersion {
        server: name.to_string(),
        value: version_text.to_string(),
    })?;

    let custom_queries_path = properties
        .get("customQueriesPath")
        .or_else(|| properties.get("custom_queries_path"))
        .map(str::trim)
        .unwrap_or_default();

    Ok(ServerRecord::new(name, hostname, username, password, version)
        .with_custom_queries_path(custom_queries_path))
}

/// Default config file location: `~/.dbfs/config.ini`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dbfs")
        .join("config.ini")
}

/// How provenance marks are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvenanceBackend {
    /// Extended attribute on each file.
    #[default]
    Xattr,
    /// Sidecar manifest in the dump root.
    Manifest,
}

/// Runtime settings for one DBFS run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the on-disk dump tree.
    pub dump_dir: PathBuf,

    /// Mount point served by the filesystem layer.
    pub mount_dir: Option<PathBuf>,

    /// Write logs here instead of stderr.
    pub log_file: Option<PathBuf>,

    /// Verbose diagnostics.
    pub verbose: bool,

    /// Provenance storage.
    pub provenance: ProvenanceBackend,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dump_dir: std::env::temp_dir().join("dbfs"),
            mount_dir: None,
            log_file: None,
            verbose: false,
            provenance: ProvenanceBackend::default(),
        }
    }
}

impl Settings {
    /// Settings with the given dump directory.
    pub fn new(dump_dir: impl Into<PathBuf>) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_mount_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_dir = Some(path.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_provenance(mut self, backend: ProvenanceBackend) -> Self {
        self.provenance = backend;
        self
    }
}
