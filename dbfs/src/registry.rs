//! Registry of configured servers.
//!
//! The registry is filled once through [`ServerRegistryBuilder`] and then
//! sealed. A sealed [`ServerRegistry`] has no mutating methods and is
//! shared by cloning (one `Arc`), so concurrent readers never race a
//! writer.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::fatal::{escalate, FatalError};

/// Connection details for one server.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerRecord {
    /// Friendly name, also the directory name under the dump root.
    pub name: String,
    pub hostname: String,
    pub username: String,
    pub password: String,
    /// SQL Server major version.
    pub version: u32,
    /// Folder holding the user's custom query files. Empty when unset.
    pub custom_queries_path: PathBuf,
}

impl ServerRecord {
    /// Create a record without custom queries.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            version,
            custom_queries_path: PathBuf::new(),
        }
    }

    /// Set the custom query folder.
    pub fn with_custom_queries_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_queries_path = path.into();
        self
    }
}

impl fmt::Debug for ServerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRecord")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("version", &self.version)
            .field("custom_queries_path", &self.custom_queries_path)
            .finish()
    }
}

/// Hostname, username and password of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub hostname: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Errors while building the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server {0} is configured more than once")]
    Duplicate(String),
}

/// Construction phase of the registry.
#[derive(Debug, Default)]
pub struct ServerRegistryBuilder {
    servers: BTreeMap<String, ServerRecord>,
}

impl ServerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server. Names must be unique.
    pub fn insert(&mut self, record: ServerRecord) -> Result<(), RegistryError> {
        match self.servers.entry(record.name.clone()) {
            btree_map::Entry::Occupied(_) => Err(RegistryError::Duplicate(record.name)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Finish construction. The builder is consumed.
    pub fn seal(self) -> ServerRegistry {
        ServerRegistry {
            servers: Arc::new(self.servers),
        }
    }
}

/// Read-only server registry.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Arc<BTreeMap<String, ServerRecord>>,
}

impl ServerRegistry {
    /// Start building a registry.
    pub fn builder() -> ServerRegistryBuilder {
        ServerRegistryBuilder::new()
    }

    /// Find a server by name.
    pub fn lookup(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.get(name)
    }

    /// Find a server by name for callers with no recovery path.
    ///
    /// An unknown name is reported and returned as a fatal error.
    pub fn lookup_or_fatal(&self, name: &str) -> Result<&ServerRecord, FatalError> {
        self.lookup(name).ok_or_else(|| {
            escalate(FatalError::UnknownServer {
                name: name.to_string(),
            })
        })
    }

    /// Hostname, username and password of a server.
    pub fn credentials(&self, name: &str) -> Result<Credentials<'_>, FatalError> {
        let record = self.lookup_or_fatal(name)?;
        Ok(Credentials {
            hostname: &record.hostname,
            username: &record.username,
            password: &record.password,
        })
    }

    /// Custom query folder of a server, if the server exists and has one.
    pub fn custom_queries_path(&self, name: &str) -> Option<&Path> {
        self.lookup(name)
            .map(|record| record.custom_queries_path.as_path())
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Servers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.values()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ServerRegistry {
        let mut builder = ServerRegistry::builder();
        builder
            .insert(
                ServerRecord::new("prod", "10.0.0.4", "sa", "hunter2", 16)
                    .with_custom_queries_path("/home/dba/queries"),
            )
            .unwrap();
        builder
            .insert(ServerRecord::new("dev", "localhost", "sa", "devpass", 14))
            .unwrap();
        builder.seal()
    }

    #[test]
    fn test_lookup() {
        let registry = sample_registry();
        assert_eq!(registry.lookup("prod").unwrap().hostname, "10.0.0.4");
        assert!(registry.lookup("staging").is_none());
    }

    #[test]
    fn test_lookup_or_fatal_unknown() {
        let registry = sample_registry();
        let err = registry.lookup_or_fatal("staging").unwrap_err();
        assert!(matches!(err, FatalError::UnknownServer { ref name } if name == "staging"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = ServerRegistry::builder();
        builder
            .insert(ServerRecord::new("prod", "a", "u", "p", 16))
            .unwrap();
        let err = builder
            .insert(ServerRecord::new("prod", "b", "u", "p", 16))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("prod".to_string()));
        assert_eq!(builder.seal().lookup("prod").unwrap().hostname, "a");
    }

    #[test]
    fn test_credentials() {
        let registry = sample_registry();
        let creds = registry.credentials("dev").unwrap();
        assert_eq!(creds.hostname, "localhost");
        assert_eq!(creds.password, "devpass");
        assert!(registry.credentials("ghost").is_err());
    }

    #[test]
    fn test_custom_queries_path() {
        let registry = sample_registry();
        assert_eq!(
            registry.custom_queries_path("prod"),
            Some(Path::new("/home/dba/queries"))
        );
        assert_eq!(registry.custom_queries_path("dev"), None);
        assert_eq!(registry.custom_queries_path("ghost"), None);
    }

    #[test]
    fn test_iter_in_name_order() {
        let registry = sample_registry();
        let names: Vec<&str> = registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "prod"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = sample_registry();
        let clone = registry.clone();
        assert!(Arc::ptr_eq(&registry.servers, &clone.servers));
    }

    #[test]
    fn test_debug_redacts_password() {
        let record = ServerRecord::new("prod", "10.0.0.4", "sa", "hunter2", 16);
        let debug = format!("{:?}", record);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServerRegistry>();
    }
}
