//! Provenance marking for synthesized files.
//!
//! Every placeholder created by the materializer is tagged so the serving
//! layer can distinguish "file we made up at startup" from "file holding
//! real query output". The check is existence only: the mark carries no
//! value.
//!
//! # Backends
//!
//! - [`XattrTagger`] - zero-length extended attribute on the file itself
//! - [`ManifestTagger`] - sidecar manifest for filesystems without xattrs

mod manifest;
mod xattr;

use std::ffi::CStr;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use manifest::ManifestTagger;
pub use xattr::XattrTagger;

/// Name of the extended attribute marking a locally generated file, as
/// passed to the xattr syscalls.
pub const PROVENANCE_ATTRIBUTE_CSTR: &CStr = c"user.dbfs";

/// [`PROVENANCE_ATTRIBUTE_CSTR`] as a Rust string.
pub const PROVENANCE_ATTRIBUTE: &str =
    match std::str::from_utf8(PROVENANCE_ATTRIBUTE_CSTR.to_bytes()) {
        Ok(name) => name,
        Err(_) => panic!("provenance attribute name must be UTF-8"),
    };

/// Setting the provenance mark failed.
///
/// This points at a filesystem capability problem (no xattr support, read
/// only mount) rather than a missing file, so callers treat it as fatal.
#[derive(Debug, Error)]
#[error("failed to set provenance mark on {}: {source}", path.display())]
pub struct AttributeError {
    /// File that could not be tagged.
    pub path: PathBuf,
    /// Underlying OS error.
    #[source]
    pub source: io::Error,
}

impl AttributeError {
    pub(crate) fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Capability to mark files as synthesized and to query that mark.
pub trait ProvenanceTagger: Send + Sync {
    /// Mark the file at `path` as synthesized. Never retried.
    fn tag(&self, path: &Path) -> Result<(), AttributeError>;

    /// Whether the file at `path` carries the mark.
    ///
    /// Any failure to answer counts as "not tagged", so a file with real
    /// content is never mistaken for a placeholder.
    fn is_tagged(&self, path: &Path) -> bool;
}

impl<T: ProvenanceTagger + ?Sized> ProvenanceTagger for &T {
    fn tag(&self, path: &Path) -> Result<(), AttributeError> {
        (**self).tag(path)
    }

    fn is_tagged(&self, path: &Path) -> bool {
        (**self).is_tagged(path)
    }
}

impl<T: ProvenanceTagger + ?Sized> ProvenanceTagger for Box<T> {
    fn tag(&self, path: &Path) -> Result<(), AttributeError> {
        (**self).tag(path)
    }

    fn is_tagged(&self, path: &Path) -> bool {
        (**self).is_tagged(path)
    }
}
