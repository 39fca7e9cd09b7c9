//! File store error types.

use std::io;
use std::path::PathBuf;

use aptly_core::error::StoreError;
use thiserror::Error;

/// Errors raised by [`crate::file::FileStore`].
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// Keys become file names, so only `[A-Za-z0-9_-]` is allowed.
    #[error("invalid store key: '{0}'")]
    InvalidKey(String),

    /// Reading or writing a document failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileStoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the disk or the file system refused more data.
    pub fn is_exhausted(&self) -> bool {
        match self {
            FileStoreError::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::StorageFull | io::ErrorKind::FileTooLarge
            ),
            FileStoreError::InvalidKey(_) => false,
        }
    }

    /// Convert into the core error for an operation on `key`.
    pub fn into_store_error(self, key: &str) -> StoreError {
        if self.is_exhausted() {
            StoreError::Exhausted {
                key: key.to_string(),
                reason: self.to_string(),
            }
        } else {
            StoreError::Unavailable(self.to_string())
        }
    }
}
