//! Local-cache-backed catalog.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use storefront_core::ProductId;
use storefront_events::{EventBus, Topic};
use storefront_storage::KeyValueStore;

use crate::product::{Product, ProductDraft, ProductPatch, decode_listing};
use crate::seed::{SEED_VERSION, default_products};
use crate::source::{CatalogError, CatalogQuery, CatalogSource};

pub const PRODUCTS_KEY: &str = "sam_fabrics_products";
pub const PRODUCTS_VERSION_KEY: &str = "sam_fabrics_products_version";

/// Catalog kept in durable client storage.
///
/// Every read goes back to storage, so edits made through another handle on
/// the same store are visible immediately. Administrative edits publish
/// `Topic::CatalogChanged`.
pub struct LocalCatalog {
    storage: Arc<dyn KeyValueStore>,
    bus: Arc<dyn EventBus>,
    // Serializes read-modify-write cycles of the admin operations.
    write_lock: Mutex<()>,
}

impl core::fmt::Debug for LocalCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalCatalog").finish_non_exhaustive()
    }
}

impl LocalCatalog {
    /// Open the catalog, writing the default seed if storage holds no catalog
    /// or one from another seed version.
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        bus: Arc<dyn EventBus>,
    ) -> Result<Self, CatalogError> {
        Self::open_with_seed(storage, bus, default_products())
    }

    pub fn open_with_seed(
        storage: Arc<dyn KeyValueStore>,
        bus: Arc<dyn EventBus>,
        seed: Vec<Product>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            storage,
            bus,
            write_lock: Mutex::new(()),
        };

        let current = catalog.storage.get(PRODUCTS_KEY)?;
        let version = catalog.storage.get(PRODUCTS_VERSION_KEY)?;
        if current.is_none() || version.as_deref() != Some(SEED_VERSION) {
            tracing::info!(products = seed.len(), version = SEED_VERSION, "seeding local catalog");
            catalog.write(&seed)?;
            catalog.storage.set(PRODUCTS_VERSION_KEY, SEED_VERSION)?;
        }

        Ok(catalog)
    }

    /// Every stored product, disabled ones included, in storage order.
    pub fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.read()
    }

    pub fn create_product(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        draft.validate()?;
        let _guard = self.lock()?;

        let mut products = self.read()?;
        let id = ProductId::new(Uuid::now_v7().simple().to_string())?;
        let product = draft.into_product(id, Utc::now()).normalized();
        products.push(product.clone());
        self.write(&products)?;

        tracing::info!(product_id = %product.id, "product created");
        self.announce();
        Ok(product)
    }

    pub fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        let _guard = self.lock()?;

        let mut products = self.read()?;
        let product = products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let mut updated = product.clone();
        patch.apply_to(&mut updated)?;
        *product = updated.normalized();
        let updated = product.clone();
        self.write(&products)?;

        tracing::info!(product_id = %id, "product updated");
        self.announce();
        Ok(updated)
    }

    /// Returns whether a product was removed.
    pub fn delete_product(&self, id: &ProductId) -> Result<bool, CatalogError> {
        let _guard = self.lock()?;

        let mut products = self.read()?;
        let before = products.len();
        products.retain(|p| &p.id != id);
        if products.len() == before {
            tracing::debug!(product_id = %id, "delete of unknown product ignored");
            return Ok(false);
        }
        self.write(&products)?;

        tracing::info!(product_id = %id, "product deleted");
        self.announce();
        Ok(true)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, CatalogError> {
        self.write_lock
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog write lock poisoned".to_string()))
    }

    fn read(&self) -> Result<Vec<Product>, CatalogError> {
        let Some(raw) = self.storage.get(PRODUCTS_KEY)? else {
            return Ok(Vec::new());
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("stored catalog is not a JSON array; treating as empty: {err}");
                return Ok(Vec::new());
            }
        };

        Ok(decode_listing(entries))
    }

    fn write(&self, products: &[Product]) -> Result<(), CatalogError> {
        let raw = serde_json::to_string(products)
            .map_err(|e| CatalogError::InvalidProduct(e.to_string()))?;
        self.storage.set(PRODUCTS_KEY, &raw)?;
        Ok(())
    }

    fn announce(&self) {
        if let Err(err) = self.bus.notify(Topic::CatalogChanged) {
            tracing::error!("failed to publish catalog change: {err}");
        }
    }
}

impl CatalogSource for LocalCatalog {
    fn get_all(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError> {
        Ok(query.select(self.read()?))
    }

    fn get_by_id(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.read()?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
