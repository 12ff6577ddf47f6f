//! Builds the dump tree of one server.
//!
//! # Failure policy
//!
//! | Failure                               | Outcome               |
//! |---------------------------------------|-----------------------|
//! | server root directory not created     | fatal (`Structural`)  |
//! | provenance mark not set               | fatal (`Attribute`)   |
//! | `customQueries` folder not created    | logged, skipped       |
//! | one placeholder file not created      | logged, skipped       |
//! | catalog query failed or degenerate    | logged, no DMV files  |
//!
//! The root directory is a precondition for everything below it, while
//! each DMV and custom query stands alone.

use std::ffi::OsString;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, CatalogError, CatalogRows, DMV_QUERY};
use crate::fatal::{escalate, FatalError};
use crate::paths::DumpRoot;
use crate::provenance::ProvenanceTagger;
use crate::registry::ServerRecord;

/// Name of the per-server folder holding custom query output.
pub const CUSTOM_QUERY_DIR_NAME: &str = "customQueries";

/// Mode for directories created in the dump tree.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode for placeholder files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// First server version that also gets `.json` placeholders.
pub const JSON_VERSION_THRESHOLD: u32 = 16;

/// Suffix of the JSON sibling placeholder.
pub const JSON_SUFFIX: &str = ".json";

/// What happened to the catalog step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Items were listed (some placeholders may still have been skipped).
    Listed { items: usize },
    /// The query failed.
    Failed(String),
    /// The query answered with no items.
    Degenerate,
}

/// A catalog row that cannot name a file directly below the server root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("catalog row {0:?} is not a plain file name")]
pub struct InvalidItemName(pub String);

/// Check that a catalog row names one entry inside the server root.
///
/// Empty names, `.`, `..` and anything holding `/` or NUL are rejected.
pub fn check_item_name(name: &str) -> Result<(), InvalidItemName> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(InvalidItemName(name.to_string()));
    }
    Ok(())
}

/// A unit of work that was left out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// File that was not created, or the raw row of a rejected catalog name.
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of materializing one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    pub server: String,
    pub root: PathBuf,
    pub dmv_files: Vec<PathBuf>,
    pub custom_query_files: Vec<PathBuf>,
    pub skipped: Vec<SkippedItem>,
    pub catalog: CatalogStatus,
}

impl MaterializeReport {
    fn new(server: &str, root: PathBuf) -> Self {
        Self {
            server: server.to_string(),
            root,
            dmv_files: Vec::new(),
            custom_query_files: Vec::new(),
            skipped: Vec::new(),
            catalog: CatalogStatus::Degenerate,
        }
    }

    fn skip(&mut self, path: PathBuf, err: &dyn std::fmt::Display) {
        warn!(path = %path.display(), error = %err, "Skipping item");
        self.skipped.push(SkippedItem {
            path,
            reason: err.to_string(),
        });
    }

    /// Number of non-fatal problems: skipped items plus a failed or empty
    /// catalog.
    pub fn warning_count(&self) -> usize {
        let catalog = match self.catalog {
            CatalogStatus::Listed { .. } => 0,
            CatalogStatus::Failed(_) | CatalogStatus::Degenerate => 1,
        };
        self.skipped.len() + catalog
    }
}

/// Creates server directories and placeholder files under a dump root.
pub struct TreeMaterializer<'a, T: ProvenanceTagger + ?Sized> {
    dump: &'a DumpRoot,
    tagger: &'a T,
}

impl<'a, T: ProvenanceTagger + ?Sized> TreeMaterializer<'a, T> {
    pub fn new(dump: &'a DumpRoot, tagger: &'a T) -> Self {
        Self { dump, tagger }
    }

    /// Query the DMV catalog of `record` and materialize its tree.
    pub fn materialize_server(
        &self,
        server_name: &str,
        record: &ServerRecord,
        client: &dyn CatalogClient,
    ) -> Result<MaterializeReport, FatalError> {
        let catalog = client.query(record, DMV_QUERY);
        self.materialize(server_name, record, catalog, record.version)
    }

    /// Materialize the tree of one server from an already fetched catalog
    /// result.
    pub fn materialize(
        &self,
        server_name: &str,
        record: &ServerRecord,
        catalog: Result<String, CatalogError>,
        version: u32,
    ) -> Result<MaterializeReport, FatalError> {
        let root = self.dump.server_root(server_name);
        info!(server = server_name, root = %root.display(), version, "Materializing server");

        if let Err(source) = create_dir(&root) {
            return Err(escalate(FatalError::Structural { path: root, source }));
        }

        let mut report = MaterializeReport::new(server_name, root.clone());

        self.create_custom_queries(&root, record, &mut report)?;
        self.create_dmv_files(&root, catalog, version, &mut report)?;

        info!(
            server = server_name,
            dmv_files = report.dmv_files.len(),
            custom_query_files = report.custom_query_files.len(),
            skipped = report.skipped.len(),
            "Server materialized"
        );
        Ok(report)
    }

    fn create_custom_queries(
        &self,
        root: &Path,
        record: &ServerRecord,
        report: &mut MaterializeReport,
    ) -> Result<(), FatalError> {
        let dir = root.join(CUSTOM_QUERY_DIR_NAME);
        if let Err(e) = create_dir(&dir) {
            report.skip(dir, &e);
            return Ok(());
        }

        let queries = match list_custom_queries(&record.custom_queries_path) {
            Ok(queries) => queries,
            Err(e) => {
                report.skip(record.custom_queries_path.clone(), &e);
                return Ok(());
            }
        };

        for query in queries {
            let path = dir.join(&query);
            if let Some(path) = self.create_placeholder(path, report)? {
                report.custom_query_files.push(path);
            }
        }
        Ok(())
    }

    fn create_dmv_files(
        &self,
        root: &Path,
        catalog: Result<String, CatalogError>,
        version: u32,
        report: &mut MaterializeReport,
    ) -> Result<(), FatalError> {
        let rows = match catalog.and_then(|raw| CatalogRows::parse(&raw)) {
            Ok(rows) => rows,
            Err(CatalogError::Degenerate { rows }) => {
                warn!(server = %report.server, rows, "DMV catalog returned no items");
                report.catalog = CatalogStatus::Degenerate;
                return Ok(());
            }
            Err(e) => {
                warn!(server = %report.server, error = %e, "Failed to query DMV list");
                report.catalog = CatalogStatus::Failed(e.to_string());
                return Ok(());
            }
        };
        report.catalog = CatalogStatus::Listed { items: rows.len() };

        for name in rows.names() {
            if let Err(e) = check_item_name(name) {
                report.skip(PathBuf::from(name), &e);
                continue;
            }

            let path = root.join(name);
            if let Some(path) = self.create_placeholder(path, report)? {
                report.dmv_files.push(path);
            }

            if version >= JSON_VERSION_THRESHOLD {
                let path = root.join(format!("{}{}", name, JSON_SUFFIX));
                if let Some(path) = self.create_placeholder(path, report)? {
                    report.dmv_files.push(path);
                }
            }
        }
        Ok(())
    }

    /// Create (or truncate) an empty file and tag it.
    ///
    /// Returns `None` when the file could not be created.
    fn create_placeholder(
        &self,
        path: PathBuf,
        report: &mut MaterializeReport,
    ) -> Result<Option<PathBuf>, FatalError> {
        if let Err(e) = create_empty_file(&path) {
            report.skip(path, &e);
            return Ok(None);
        }
        self.tagger.tag(&path).map_err(|e| escalate(e))?;
        debug!(path = %path.display(), "Placeholder created");
        Ok(Some(path))
    }
}

fn create_dir(path: &Path) -> io::Result<()> {
    match DirBuilder::new().mode(DEFAULT_DIR_MODE).create(path) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        other => other,
    }
}

fn create_empty_file(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(DEFAULT_FILE_MODE)
        .open(path)
        .map(drop)
}

/// Names of the custom query files in `dir`, sorted.
///
/// Only regular, non-hidden files count. An empty path means no custom
/// queries are configured.
pub fn list_custom_queries(dir: &Path) -> io::Result<Vec<OsString>> {
    if dir.as_os_str().is_empty() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !name.as_encoded_bytes().starts_with(b".") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
