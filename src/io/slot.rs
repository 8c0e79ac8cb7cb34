use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;

/// Error type for durable slot operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid slot name '{0}': use letters, digits, '-' or '_'")]
    InvalidKey(String),
    #[error("could not create data directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not serialize task list: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One named, durable key in a data directory.
///
/// The slot lives at `<dir>/<key>.json`; its change signal at
/// `<dir>/.<key>.signal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    dir: PathBuf,
    key: String,
}

impl Slot {
    pub fn new(dir: &Path, key: &str) -> Result<Self, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(Slot {
            dir: dir.to_path_buf(),
            key: key.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    pub fn signal_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.signal", self.key))
    }

    /// Create the data directory if needed.
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Raw slot bytes; `None` when the slot has never been written. Not
    /// decoded here so content that is not UTF-8 can still be quarantined.
    pub fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path();
        match fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read { path, source: e }),
        }
    }

    /// Overwrite the slot atomically.
    pub fn write(&self, content: &str) -> Result<(), StorageError> {
        let path = self.path();
        atomic_write(&path, content.as_bytes()).map_err(|e| StorageError::Write { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_derive_from_key() {
        let slot = Slot::new(Path::new("/data"), "tasks").unwrap();
        assert_eq!(slot.path(), PathBuf::from("/data/tasks.json"));
        assert_eq!(slot.signal_path(), PathBuf::from("/data/.tasks.signal"));
    }

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        for key in ["", "../tasks", "a/b", "tasks.json", " "] {
            assert!(
                matches!(Slot::new(Path::new("/data"), key), Err(StorageError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
        assert!(Slot::new(Path::new("/data"), "work_list-2").is_ok());
    }

    #[test]
    fn read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let slot = Slot::new(tmp.path(), "tasks").unwrap();
        assert!(slot.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let tmp = TempDir::new().unwrap();
        let slot = Slot::new(&tmp.path().join("nested"), "tasks").unwrap();
        slot.ensure_dir().unwrap();
        slot.write("[]").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn read_returns_bytes_that_are_not_utf8() {
        let tmp = TempDir::new().unwrap();
        let slot = Slot::new(tmp.path(), "tasks").unwrap();
        fs::write(slot.path(), b"caf\xe9").unwrap();
        assert_eq!(slot.read().unwrap(), Some(b"caf\xe9".to_vec()));
    }

    #[test]
    fn read_fails_when_slot_path_is_a_directory() {
        let tmp = TempDir::new().unwrap();
        let slot = Slot::new(tmp.path(), "tasks").unwrap();
        fs::create_dir_all(slot.path()).unwrap();
        assert!(matches!(slot.read(), Err(StorageError::Read { .. })));
    }

    #[test]
    fn write_fails_when_slot_path_is_a_directory() {
        let tmp = TempDir::new().unwrap();
        let slot = Slot::new(tmp.path(), "tasks").unwrap();
        fs::create_dir_all(slot.path()).unwrap();
        assert!(matches!(slot.write("[]"), Err(StorageError::Write { .. })));
    }
}
