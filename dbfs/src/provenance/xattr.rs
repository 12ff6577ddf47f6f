//! Extended attribute backend.

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::trace;

use super::{AttributeError, ProvenanceTagger, PROVENANCE_ATTRIBUTE_CSTR};

/// Tags files with a zero-length extended attribute.
#[derive(Debug, Clone)]
pub struct XattrTagger {
    name: CString,
}

impl XattrTagger {
    /// Tagger using [`PROVENANCE_ATTRIBUTE_CSTR`].
    pub fn new() -> Self {
        Self::with_name(PROVENANCE_ATTRIBUTE_CSTR)
    }

    /// Tagger using a custom attribute name.
    pub fn with_name(name: &CStr) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    /// The attribute name this tagger sets.
    pub fn attribute_name(&self) -> &CStr {
        &self.name
    }
}

impl Default for XattrTagger {
    fn default() -> Self {
        Self::new()
    }
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

impl ProvenanceTagger for XattrTagger {
    fn tag(&self, path: &Path) -> Result<(), AttributeError> {
        let c_path = c_path(path).map_err(|e| AttributeError::new(path, e))?;

        // Size 0: only the attribute's existence matters.
        let rc = unsafe {
            libc::setxattr(
                c_path.as_ptr(),
                self.name.as_ptr(),
                b"1".as_ptr().cast(),
                0,
                0,
            )
        };
        if rc != 0 {
            return Err(AttributeError::new(path, io::Error::last_os_error()));
        }

        trace!(path = %path.display(), "Provenance attribute set");
        Ok(())
    }

    fn is_tagged(&self, path: &Path) -> bool {
        let Ok(c_path) = c_path(path) else {
            return false;
        };

        // -1 covers ENODATA as well as every other failure.
        let length = unsafe {
            libc::getxattr(
                c_path.as_ptr(),
                self.name.as_ptr(),
                std::ptr::null_mut(),
                0,
            )
        };
        length >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    /// Temp directories on some CI filesystems reject `user.*` attributes.
    fn tagged_file(dir: &TempDir, name: &str) -> Option<std::path::PathBuf> {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        match XattrTagger::new().tag(&path) {
            Ok(()) => Some(path),
            Err(e) if e.source.raw_os_error() == Some(libc::ENOTSUP) => None,
            Err(e) => panic!("unexpected xattr failure: {}", e),
        }
    }

    #[test]
    fn test_default_attribute_name() {
        let tagger = XattrTagger::default();
        assert_eq!(
            tagger.attribute_name().to_str().unwrap(),
            super::super::PROVENANCE_ATTRIBUTE
        );
    }

    #[test]
    fn test_tag_then_is_tagged() {
        let dir = TempDir::new().unwrap();
        let Some(path) = tagged_file(&dir, "dm_os_sys_info") else {
            return;
        };
        assert!(XattrTagger::new().is_tagged(&path));
    }

    #[test]
    fn test_untouched_file_is_not_tagged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("real_output");
        fs::write(&path, "fetched content").unwrap();
        assert!(!XattrTagger::new().is_tagged(&path));
    }

    #[test]
    fn test_missing_file_is_not_tagged() {
        let dir = TempDir::new().unwrap();
        assert!(!XattrTagger::new().is_tagged(&dir.path().join("nope")));
    }

    #[test]
    fn test_tag_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope");
        let err = XattrTagger::new().tag(&path).unwrap_err();
        assert_eq!(err.path, path);
    }

    #[test]
    fn test_other_attribute_name_is_independent() {
        let dir = TempDir::new().unwrap();
        let Some(path) = tagged_file(&dir, "dm_exec_requests") else {
            return;
        };
        let other = XattrTagger::with_name(c"user.something_else");
        assert!(!other.is_tagged(&path));
    }
}
