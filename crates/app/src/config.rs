//! Startup configuration read from `STOREFRONT_*` environment variables.
//!
//! Unset variables take defaults; unparseable ones are logged and replaced by
//! the default.

use std::path::PathBuf;

use storefront_storage::FileStore;

pub const DATA_DIR_ENV: &str = "STOREFRONT_DATA_DIR";
pub const STORAGE_ENV: &str = "STOREFRONT_STORAGE";
pub const STORAGE_QUOTA_ENV: &str = "STOREFRONT_STORAGE_QUOTA_BYTES";
pub const CATALOG_ENV: &str = "STOREFRONT_CATALOG";
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogBackend {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub storage_quota: Option<u64>,
    pub catalog: CatalogBackend,
    pub api_url: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: FileStore::default_root().unwrap_or_else(|| PathBuf::from(".storefront")),
            storage: StorageBackend::default(),
            storage_quota: None,
            catalog: CatalogBackend::default(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl StorefrontConfig {
    /// In-memory storage and the local catalog; nothing touches disk.
    pub fn ephemeral() -> Self {
        Self {
            storage: StorageBackend::Memory,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = get(STORAGE_ENV) {
            match raw.to_ascii_lowercase().as_str() {
                "file" => config.storage = StorageBackend::File,
                "memory" => config.storage = StorageBackend::Memory,
                other => tracing::warn!("{STORAGE_ENV}={other} not recognized; using file storage"),
            }
        }

        if let Some(raw) = get(STORAGE_QUOTA_ENV) {
            match raw.parse::<u64>() {
                Ok(quota) => config.storage_quota = Some(quota),
                Err(err) => tracing::warn!("{STORAGE_QUOTA_ENV}={raw} is not a byte count ({err}); no quota"),
            }
        }

        if let Some(raw) = get(CATALOG_ENV) {
            match raw.to_ascii_lowercase().as_str() {
                "local" => config.catalog = CatalogBackend::Local,
                "remote" => config.catalog = CatalogBackend::Remote,
                other => tracing::warn!("{CATALOG_ENV}={other} not recognized; using the local catalog"),
            }
        }

        match get(API_URL_ENV) {
            Some(url) => config.api_url = url,
            None if config.catalog == CatalogBackend::Remote => {
                tracing::warn!("{API_URL_ENV} not set; using {DEFAULT_API_URL}");
            }
            None => {}
        }

        config
    }
}
