//! Sidecar manifest backend.
//!
//! Keeps the set of synthesized paths in a plain text file, one absolute
//! path per line. Used where the dump directory lives on a filesystem
//! without extended attribute support.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{AttributeError, ProvenanceTagger};

/// Tags files by recording them in a manifest file.
#[derive(Debug)]
pub struct ManifestTagger {
    manifest_path: PathBuf,
    tagged: Mutex<HashSet<PathBuf>>,
}

impl ManifestTagger {
    /// Default manifest file name inside the dump root.
    pub const FILE_NAME: &'static str = ".dbfs-manifest";

    /// Open (or start) the manifest at `manifest_path`.
    ///
    /// Existing entries are loaded so marks survive a restart.
    pub fn open(manifest_path: impl Into<PathBuf>) -> io::Result<Self> {
        let manifest_path = manifest_path.into();
        let tagged = match fs::read_to_string(&manifest_path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e),
        };

        debug!(
            manifest = %manifest_path.display(),
            entries = tagged.len(),
            "Provenance manifest opened"
        );

        Ok(Self {
            manifest_path,
            tagged: Mutex::new(tagged),
        })
    }

    /// Open the manifest stored as [`Self::FILE_NAME`] in `dir`.
    pub fn in_dir(dir: &Path) -> io::Result<Self> {
        Self::open(dir.join(Self::FILE_NAME))
    }

    /// Location of the manifest file.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Number of recorded paths.
    pub fn len(&self) -> usize {
        self.tagged.lock().len()
    }

    /// Whether no path has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, path: &Path) -> io::Result<()> {
        let line = path.to_str().filter(|s| !s.contains('\n')).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "path cannot be stored in the manifest",
            )
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.manifest_path)?;
        writeln!(file, "{}", line)
    }
}

impl ProvenanceTagger for ManifestTagger {
    fn tag(&self, path: &Path) -> Result<(), AttributeError> {
        if fs::symlink_metadata(path).is_err() {
            return Err(AttributeError::new(
                path,
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }

        let mut tagged = self.tagged.lock();
        if tagged.contains(path) {
            return Ok(());
        }
        self.append(path).map_err(|e| AttributeError::new(path, e))?;
        tagged.insert(path.to_path_buf());
        Ok(())
    }

    fn is_tagged(&self, path: &Path) -> bool {
        // A recorded file that was removed behind our back no longer counts.
        self.tagged.lock().contains(path) && fs::symlink_metadata(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_tag_then_is_tagged() {
        let dir = TempDir::new().unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        let file = dir.path().join("dm_exec_sessions");
        File::create(&file).unwrap();

        tagger.tag(&file).unwrap();

        assert!(tagger.is_tagged(&file));
        assert_eq!(tagger.len(), 1);
    }

    #[test]
    fn test_untouched_file_is_not_tagged() {
        let dir = TempDir::new().unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        let file = dir.path().join("real_output");
        fs::write(&file, "rows").unwrap();

        assert!(!tagger.is_tagged(&file));
        assert!(tagger.is_empty());
    }

    #[test]
    fn test_tag_twice_records_once() {
        let dir = TempDir::new().unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        let file = dir.path().join("dm_os_wait_stats");
        File::create(&file).unwrap();

        tagger.tag(&file).unwrap();
        tagger.tag(&file).unwrap();

        let contents = fs::read_to_string(tagger.manifest_path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_marks_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("dm_os_sys_info");
        File::create(&file).unwrap();

        ManifestTagger::in_dir(dir.path())
            .unwrap()
            .tag(&file)
            .unwrap();

        let reopened = ManifestTagger::in_dir(dir.path()).unwrap();
        assert!(reopened.is_tagged(&file));
    }

    #[test]
    fn test_removed_file_is_not_tagged() {
        let dir = TempDir::new().unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        let file = dir.path().join("dm_tran_locks");
        File::create(&file).unwrap();
        tagger.tag(&file).unwrap();

        fs::remove_file(&file).unwrap();

        assert!(!tagger.is_tagged(&file));
    }

    #[test]
    fn test_tag_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        let missing = dir.path().join("missing");

        let err = tagger.tag(&missing).unwrap_err();
        assert_eq!(err.path, missing);
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unwritable_manifest_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("dm_exec_requests");
        File::create(&file).unwrap();
        let tagger = ManifestTagger::in_dir(dir.path()).unwrap();
        // A directory squatting on the manifest path makes appends fail.
        fs::create_dir(tagger.manifest_path()).unwrap();

        assert!(tagger.tag(&file).is_err());
        assert!(!tagger.is_tagged(&file));
    }
}
