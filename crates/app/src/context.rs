//! Composition root: builds every storefront collaborator from configuration.

use std::sync::Arc;

use anyhow::Context;

use storefront_cart::{CartPersistence, CartStore, StorageCartPersistence};
use storefront_catalog::{CatalogSource, LocalCatalog};
use storefront_core::{DomainResult, ProductId};
use storefront_events::{EventBus, InMemoryEventBus};
use storefront_orders::{CustomerDetails, LocalOrderCapture, Order, OrderCapture};
use storefront_storage::{FileStore, InMemoryStore, KeyValueStore};

use crate::config::{CatalogBackend, StorageBackend, StorefrontConfig};

/// One running storefront client: storage, bus, catalog, cart and order capture.
///
/// The catalog variant is chosen once, here, from configuration. The cart
/// store never learns which one is active.
pub struct Storefront {
    config: StorefrontConfig,
    bus: Arc<InMemoryEventBus>,
    storage: Arc<dyn KeyValueStore>,
    persistence: Arc<dyn CartPersistence>,
    catalog: Arc<dyn CatalogSource>,
    local_catalog: Option<Arc<LocalCatalog>>,
    orders: Arc<dyn OrderCapture>,
    local_orders: Option<Arc<LocalOrderCapture>>,
    cart: CartStore,
}

impl core::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .field("catalog", &self.catalog.name())
            .field("orders", &self.orders.name())
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    pub fn init(config: StorefrontConfig) -> anyhow::Result<Self> {
        let storage = open_storage(&config)?;
        Self::init_with_storage(config, storage)
    }

    /// Like [`Storefront::init`] but over an existing store, e.g. one shared
    /// with another `Storefront` to stand in for a second browser tab.
    pub fn init_with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        Self::init_shared(config, storage, Arc::new(InMemoryEventBus::new()))
    }

    /// Share both storage and the notification bus with other instances.
    pub fn init_shared(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
        bus: Arc<InMemoryEventBus>,
    ) -> anyhow::Result<Self> {
        let (catalog, local_catalog) = open_catalog(&config, storage.clone(), bus.clone())?;
        let (orders, local_orders) = open_orders(&config, storage.clone())?;

        let persistence: Arc<dyn CartPersistence> =
            Arc::new(StorageCartPersistence::new(storage.clone()));
        let cart = CartStore::init(persistence.clone(), bus.clone());

        tracing::info!(
            catalog = catalog.name(),
            orders = orders.name(),
            cart_items = cart.item_count(),
            "storefront initialized"
        );

        Ok(Self {
            config,
            bus,
            storage,
            persistence,
            catalog,
            local_catalog,
            orders,
            local_orders,
            cart,
        })
    }

    /// Tear down in reverse order of construction.
    pub fn dispose(self) {
        let Self { cart, bus, .. } = self;
        cart.dispose();
        tracing::info!(
            cart_listeners = bus.handler_count(storefront_events::Topic::CartChanged),
            "storefront disposed"
        );
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn bus(&self) -> Arc<dyn EventBus> {
        self.bus.clone()
    }

    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        self.storage.clone()
    }

    pub fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    /// Admin catalog operations; only the local catalog supports them.
    pub fn admin_catalog(&self) -> Option<&LocalCatalog> {
        self.local_catalog.as_deref()
    }

    /// Back-office order list; only the local order capture keeps one.
    pub fn admin_orders(&self) -> Option<&LocalOrderCapture> {
        self.local_orders.as_deref()
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    /// Look the product up in the active catalog and add it to the cart.
    pub fn add_to_cart_by_id(&mut self, product_id: &ProductId) -> DomainResult<bool> {
        self.cart.add_by_id(self.catalog.as_ref(), product_id)
    }

    /// Another cart store over the same storage and bus (a second tab).
    pub fn open_cart_session(&self) -> CartStore {
        CartStore::init(self.persistence.clone(), self.bus.clone())
    }

    pub fn checkout(&mut self, customer: CustomerDetails) -> DomainResult<Order> {
        storefront_orders::checkout(&mut self.cart, self.orders.as_ref(), customer)
    }
}

fn open_storage(config: &StorefrontConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.storage {
        StorageBackend::Memory => {
            let store = match config.storage_quota {
                Some(quota) => InMemoryStore::with_quota(usize::try_from(quota).unwrap_or(usize::MAX)),
                None => InMemoryStore::new(),
            };
            Ok(Arc::new(store))
        }
        StorageBackend::File => {
            let mut store = FileStore::open(&config.data_dir).with_context(|| {
                format!("failed to open storage at {}", config.data_dir.display())
            })?;
            if let Some(quota) = config.storage_quota {
                store = store.with_quota(quota);
            }
            tracing::info!(root = %store.root().display(), "file storage opened");
            Ok(Arc::new(store))
        }
    }
}

type Catalogs = (Arc<dyn CatalogSource>, Option<Arc<LocalCatalog>>);

fn open_catalog(
    config: &StorefrontConfig,
    storage: Arc<dyn KeyValueStore>,
    bus: Arc<InMemoryEventBus>,
) -> anyhow::Result<Catalogs> {
    if config.catalog == CatalogBackend::Remote {
        #[cfg(feature = "remote")]
        {
            let remote: Arc<dyn CatalogSource> = Arc::new(
                storefront_catalog::RemoteCatalog::new(config.api_url.clone())
                    .context("failed to build remote catalog client")?,
            );
            return Ok((remote, None));
        }
        #[cfg(not(feature = "remote"))]
        {
            tracing::warn!("remote catalog requested but the remote feature is not enabled, falling back to local");
        }
    }

    let local = Arc::new(LocalCatalog::open(storage, bus).context("failed to open local catalog")?);
    let catalog: Arc<dyn CatalogSource> = local.clone();
    Ok((catalog, Some(local)))
}

type OrderCaptures = (Arc<dyn OrderCapture>, Option<Arc<LocalOrderCapture>>);

fn open_orders(
    config: &StorefrontConfig,
    storage: Arc<dyn KeyValueStore>,
) -> anyhow::Result<OrderCaptures> {
    if config.catalog == CatalogBackend::Remote {
        #[cfg(feature = "remote")]
        {
            let remote: Arc<dyn OrderCapture> = Arc::new(
                storefront_orders::HttpOrderCapture::new(config.api_url.clone())
                    .context("failed to build order capture client")?,
            );
            return Ok((remote, None));
        }
    }

    let local = Arc::new(LocalOrderCapture::new(storage));
    let orders: Arc<dyn OrderCapture> = local.clone();
    Ok((orders, Some(local)))
}
