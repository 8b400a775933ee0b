//! File-backed store: one file per key under a profile directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::store::{KeyValueStore, StorageError};

/// Directory-per-profile string store.
///
/// Writes go to a uniquely named temporary file in the same directory and are
/// renamed into place, so a reader never observes a half-written value and
/// concurrent writers (several handles on one profile) resolve as
/// last-writer-wins. The optional quota covers the total size of
/// all values in the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root, quota: None })
    }

    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default profile directory (`<platform data dir>/storefront`).
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("storefront"))
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn used_bytes_excluding(&self, exclude: &Path) -> Result<u64, StorageError> {
        let io_err = |source| StorageError::Io {
            key: self.root.display().to_string(),
            source,
        };
        let mut total = 0;
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if path == exclude || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            total += entry.metadata().map_err(io_err)?.len();
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        if let Some(capacity) = self.quota {
            let needed = self.used_bytes_excluding(&path)? + value.len() as u64;
            if needed > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed: usize::try_from(needed).unwrap_or(usize::MAX),
                    capacity: usize::try_from(capacity).unwrap_or(usize::MAX),
                });
            }
        }

        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|err| io_err(err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
