use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CodecError, PersistError, PersistResult};
use crate::key::RecordKey;
use crate::traits::RecordStore;

/// Filesystem record store: one flat file per record under a root directory.
///
/// Writes go to a temporary file in the root and are renamed over the
/// target, so a crash mid-write leaves the previous record intact.
#[derive(Debug)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> PersistResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "record store opened");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the file backing `key`.
    pub fn path_for(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl RecordStore for FsRecordStore {
    fn read(&self, key: &RecordKey) -> PersistResult<Option<String>> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| PersistError::Corrupt {
                key: key.to_string(),
                source: CodecError::NotUtf8,
            })
    }

    fn write(&self, key: &RecordKey, contents: &str) -> PersistResult<()> {
        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> PersistResult<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> PersistResult<Vec<RecordKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(RecordKey::parse) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
