//! Translation between mount-relative paths and dump-directory paths.
//!
//! The filesystem layer always receives paths relative to the mount point
//! (e.g. `/prod/dm_exec_requests`). The real file lives at the same suffix
//! below the dump root. The mapping is plain string concatenation: no `..`
//! handling and no symlink resolution.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// The configured dump root.
///
/// The root is always held with a trailing `/`, so both `"prod"` and
/// `"/prod"` land below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRoot {
    root: OsString,
}

impl DumpRoot {
    /// Create a dump root from a directory path.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let mut root = root.as_ref().as_os_str().to_os_string();
        if !root.as_encoded_bytes().ends_with(b"/") {
            root.push("/");
        }
        Self { root }
    }

    /// The root as stored, trailing separator included.
    pub fn as_os_str(&self) -> &OsStr {
        &self.root
    }

    /// The root as a path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.root)
    }

    /// Map a mount-relative path to its location in the dump directory.
    pub fn to_dump_path(&self, relative: impl AsRef<OsStr>) -> PathBuf {
        let mut path = self.root.clone();
        path.push(relative);
        PathBuf::from(path)
    }

    /// Directory holding the materialized tree of one server.
    pub fn server_root(&self, server_name: &str) -> PathBuf {
        self.to_dump_path(server_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_separator() {
        let root = DumpRoot::new("/tmp/dbfs");
        assert_eq!(root.as_os_str(), "/tmp/dbfs/");
    }

    #[test]
    fn test_new_keeps_existing_separator() {
        let root = DumpRoot::new("/tmp/dbfs/");
        assert_eq!(root.as_os_str(), "/tmp/dbfs/");
    }

    #[test]
    fn test_to_dump_path_mount_relative() {
        let root = DumpRoot::new("/tmp/dbfs");
        assert_eq!(
            root.to_dump_path("/prod/dm_os_sys_info").as_os_str(),
            "/tmp/dbfs//prod/dm_os_sys_info"
        );
    }

    #[test]
    fn test_server_root() {
        let root = DumpRoot::new("/var/lib/dbfs");
        assert_eq!(root.server_root("prod"), PathBuf::from("/var/lib/dbfs/prod"));
    }

    #[test]
    fn test_no_normalization() {
        let root = DumpRoot::new("/tmp/dbfs");
        assert_eq!(root.to_dump_path("/../etc").as_os_str(), "/tmp/dbfs//../etc");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_concatenation_identity(
                root in "/[a-z0-9_]{1,12}(/[a-z0-9_]{1,12}){0,3}",
                relative in "[/a-zA-Z0-9_.]{0,40}"
            ) {
                let dump = DumpRoot::new(&root);
                let expected = format!("{}{}", dump.as_os_str().to_string_lossy(), relative);
                prop_assert_eq!(dump.to_dump_path(&relative).into_os_string(), OsString::from(expected));
            }

            #[test]
            fn test_injective(
                a in "[/a-z0-9]{0,20}",
                b in "[/a-z0-9]{0,20}"
            ) {
                let dump = DumpRoot::new("/dump");
                prop_assume!(a != b);
                prop_assert_ne!(
                    dump.to_dump_path(&a).into_os_string(),
                    dump.to_dump_path(&b).into_os_string()
                );
            }
        }
    }
}
