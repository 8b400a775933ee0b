use std::sync::Arc;

use storefront_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the store's capacity.
    #[error("storage quota exceeded writing '{key}' ({needed} bytes needed, {capacity} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        capacity: usize,
    },

    /// Storage is disabled or otherwise unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The key cannot be represented by this backend.
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage io error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<StorageError> for DomainError {
    fn from(value: StorageError) -> Self {
        DomainError::persistence(value.to_string())
    }
}

/// Profile-scoped string key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
