//! Boundary to the server's DMV catalog.
//!
//! The materializer only needs one query answered: the list of DMV names.
//! The answer is tab/newline separated text whose first row is the column
//! label. [`CatalogRows`] turns that text into item names.

use std::io;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::registry::ServerRecord;

/// Lists the DMVs (schema 4 leaves out INFORMATION_SCHEMA).
pub const DMV_QUERY: &str = "SELECT name from sys.system_views where schema_id = 4";

/// Errors from the catalog query. Never fatal.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The query could not be run or the server reported an error.
    #[error("catalog query failed (code {code}): {message}")]
    QueryFailed { code: i32, message: String },

    /// The client process could not be started.
    #[error("failed to run catalog client: {0}")]
    Spawn(#[from] io::Error),

    /// Only the header row (or nothing) came back.
    #[error("catalog returned {rows} row(s), expected a header and at least one item")]
    Degenerate { rows: usize },
}

/// Runs a query against a server and returns its raw text result.
pub trait CatalogClient {
    fn query(&self, server: &ServerRecord, query: &str) -> Result<String, CatalogError>;
}

impl<T: CatalogClient + ?Sized> CatalogClient for &T {
    fn query(&self, server: &ServerRecord, query: &str) -> Result<String, CatalogError> {
        (**self).query(server, query)
    }
}

/// Item names from a catalog result, header excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRows {
    names: Vec<String>,
}

impl CatalogRows {
    /// Parse a raw catalog result.
    ///
    /// Blank lines and trailing carriage returns are dropped. The first
    /// remaining row is the column label; at least one row must follow it.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let rows: Vec<&str> = raw
            .split('\n')
            .map(|row| row.trim_end_matches('\r'))
            .filter(|row| !row.is_empty())
            .collect();

        if rows.len() <= 1 {
            return Err(CatalogError::Degenerate { rows: rows.len() });
        }

        Ok(Self {
            names: rows[1..].iter().map(|row| row.to_string()).collect(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Catalog client backed by the `sqlcmd` command line tool.
#[derive(Debug, Clone)]
pub struct SqlcmdClient {
    program: String,
}

impl SqlcmdClient {
    /// Client running `sqlcmd` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("sqlcmd")
    }

    /// Client running a specific binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SqlcmdClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient for SqlcmdClient {
    fn query(&self, server: &ServerRecord, query: &str) -> Result<String, CatalogError> {
        debug!(server = %server.name, hostname = %server.hostname, "Running catalog query");

        let query = format!("SET NOCOUNT ON; {}", query);
        let output = Command::new(&self.program)
            .arg("-S")
            .arg(&server.hostname)
            .arg("-U")
            .arg(&server.username)
            .arg("-Q")
            .arg(&query)
            .arg("-W")
            .arg("-s")
            .arg("\t")
            .env("SQLCMDPASSWORD", &server.password)
            .output()?;

        if !output.status.success() {
            return Err(CatalogError::QueryFailed {
                code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(normalize_sqlcmd_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// Reduce `sqlcmd` output to header + rows.
///
/// Drops the dashed underline below the header, blank lines and the
/// "(N rows affected)" footer.
pub fn normalize_sqlcmd_output(raw: &str) -> String {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| c == '-' || c == '\t'))
        .filter(|line| !(line.starts_with('(') && line.ends_with("affected)")))
        .collect::<Vec<_>>()
        .join("\n")
}
