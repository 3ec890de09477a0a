//! JSON-file key-value store with atomic replacement.
//!
//! All keys live in one JSON object on disk. A batch is applied by writing
//! the whole object to a sibling temp file, syncing it, and renaming it over
//! the current file, so readers see either the old or the new document.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::KeyValueStore;
use crate::error::StorageError;

/// Key-value store persisted as a single JSON document.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Store backed by the JSON document at `path`.
    ///
    /// The file and its parent directory are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "session.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();

        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                log::warn!(
                    "overwriting unreadable store {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        };
        for (key, value) in entries {
            document.insert((*key).to_string(), value.clone());
        }
        let serialized = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = TempFile::create(self.temp_path())?;
        tmp.write_and_sync(serialized.as_bytes())?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Temp file removed on drop unless it was renamed into place.
struct TempFile {
    path: PathBuf,
    file: Option<File>,
    persisted: bool,
}

impl TempFile {
    fn create(path: PathBuf) -> Result<Self, StorageError> {
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            persisted: false,
        })
    }

    fn write_and_sync(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(mut file) = self.file.as_ref() {
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn persist(mut self, target: &Path) -> Result<(), StorageError> {
        // Close the handle before renaming (required on Windows).
        drop(self.file.take());
        fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("session.json"));
        assert_eq!(store.get("chatHistory").unwrap(), None);
    }

    #[test]
    fn test_write_batch_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested").join("session.json"));

        store
            .write_batch(&[("a", "1".to_string()), ("b", "[]".to_string())])
            .unwrap();
        store.write_batch(&[("a", "2".to_string())]).unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("[]"));
        assert!(!store.temp_path().exists(), "temp file must not linger");
    }

    #[test]
    fn test_corrupt_document_is_an_error_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{{{ definitely not json").unwrap();
        let store = FileKeyValueStore::new(&path);

        assert!(matches!(
            store.get("a").unwrap_err(),
            StorageError::Serialization(_)
        ));

        store.write_batch(&[("a", "ok".to_string())]).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileKeyValueStore::new(&path);
        store.write_batch(&[("a", "before".to_string())]).unwrap();

        // A directory at the temp path makes File::create fail.
        fs::create_dir(store.temp_path()).unwrap();
        assert!(store.write_batch(&[("a", "after".to_string())]).is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("before"));
    }
}
