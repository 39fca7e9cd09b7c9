//! Durable key-value store: one JSON file per key.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aptly_core::error::StoreError;
use aptly_core::traits::KeyValueStore;

use crate::error::FileStoreError;

/// Stores each key as `<root>/<key>.json`.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never sees a half-written document.
pub struct FileStore {
    root: PathBuf,
    // Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| FileStoreError::io(&root, e))?;
        tracing::debug!(root = %root.display(), "file store opened");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, FileStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(FileStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn read(&self, key: &str) -> Result<Option<String>, FileStoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FileStoreError::io(path, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), FileStoreError> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::write(&tmp, value).map_err(|e| FileStoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| FileStoreError::io(&path, e))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileStoreError::io(path, e)),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key).map_err(|e| e.into_store_error(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.write(key, &value).map_err(|e| {
            tracing::warn!(key, error = %e, "store write failed");
            e.into_store_error(key)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.delete(key).map_err(|e| e.into_store_error(key))
    }
}
