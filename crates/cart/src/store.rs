//! The cart store: one session's cart plus its persistence and notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use storefront_catalog::{CatalogError, CatalogSource, Product};
use storefront_core::{DomainError, DomainResult, ProductId, SessionId};
use storefront_events::{EventBus, Notification, SubscriptionHandle, Topic, execute};

use crate::cart::{Cart, CartCommand, CartLine, ProductSnapshot};
use crate::persistence::CartPersistence;

/// Sole mutation surface for one session's cart.
///
/// Built with [`CartStore::init`], which loads the persisted cart and starts
/// listening for `cartChanged` from other sessions. A foreign change marks the
/// store stale; the next mutation reloads from persistence before applying
/// itself. Concurrent writers are still last-writer-wins.
///
/// Every mutation that changes the cart is saved (best-effort) and announced
/// as `Topic::CartChanged`. No-op mutations do neither.
pub struct CartStore {
    session: SessionId,
    cart: Cart,
    persistence: Arc<dyn CartPersistence>,
    bus: Arc<dyn EventBus>,
    stale: Arc<AtomicBool>,
    listener: Option<SubscriptionHandle>,
}

impl core::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartStore")
            .field("session", &self.session)
            .field("lines", &self.cart.lines().len())
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    pub fn init(persistence: Arc<dyn CartPersistence>, bus: Arc<dyn EventBus>) -> Self {
        Self::init_with_session(SessionId::new(), persistence, bus)
    }

    pub fn init_with_session(
        session: SessionId,
        persistence: Arc<dyn CartPersistence>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let cart = persistence.load(session);
        let stale = Arc::new(AtomicBool::new(false));

        let flag = stale.clone();
        let listener = bus.subscribe(
            Topic::CartChanged,
            Box::new(move |notification: &Notification| -> anyhow::Result<()> {
                if notification.is_foreign_to(session) {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(())
            }),
        );

        tracing::debug!(%session, lines = cart.lines().len(), "cart store initialized");

        Self {
            session,
            cart,
            persistence,
            bus,
            stale,
            listener: Some(listener),
        }
    }

    /// Stop listening for foreign changes. The persisted cart is left as is.
    pub fn dispose(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe();
        }
        tracing::debug!(session = %self.session, "cart store disposed");
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    pub fn cart_total(&self) -> u64 {
        self.cart.total()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Whether another session changed the cart since this store last read it.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Returns whether the cart changed (always `true` on success).
    pub fn add_to_cart(&mut self, product: &Product) -> DomainResult<bool> {
        self.dispatch(CartCommand::AddProduct(ProductSnapshot::from(product)))
    }

    /// Look the product up in `catalog` and add it. An unknown id is an
    /// invalid argument.
    pub fn add_by_id(
        &mut self,
        catalog: &dyn CatalogSource,
        product_id: &ProductId,
    ) -> DomainResult<bool> {
        let product = catalog.get_by_id(product_id).map_err(|err| match err {
            CatalogError::NotFound(id) => {
                DomainError::invalid_argument(format!("product '{id}' is not in the catalog"))
            }
            other => other.into(),
        })?;
        self.add_to_cart(&product)
    }

    /// Absent ids are a no-op returning `false`.
    pub fn remove_from_cart(&mut self, product_id: &ProductId) -> DomainResult<bool> {
        self.dispatch(CartCommand::RemoveProduct(product_id.clone()))
    }

    /// Sets the quantity exactly. Zero or below removes the line.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> DomainResult<bool> {
        self.dispatch(CartCommand::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
    }

    pub fn clear_cart(&mut self) -> DomainResult<bool> {
        self.dispatch(CartCommand::Clear)
    }

    /// Replace the in-memory cart with the persisted one.
    pub fn reload(&mut self) {
        self.stale.store(false, Ordering::SeqCst);
        self.cart = self.persistence.load(self.session);
        tracing::debug!(session = %self.session, lines = self.cart.lines().len(), "cart reloaded");
    }

    /// Reload only if a foreign change was observed. Returns whether it reloaded.
    pub fn refresh_if_stale(&mut self) -> bool {
        if !self.is_stale() {
            return false;
        }
        self.reload();
        true
    }

    fn dispatch(&mut self, command: CartCommand) -> DomainResult<bool> {
        self.refresh_if_stale();

        let events = execute(&mut self.cart, &command)?;
        if events.is_empty() {
            return Ok(false);
        }

        self.persistence.save(&self.cart);

        let notification = Notification::from_session(Topic::CartChanged, self.session);
        if let Err(err) = self.bus.publish(notification) {
            tracing::error!(session = %self.session, "failed to publish cart change: {err}");
        }

        tracing::debug!(
            session = %self.session,
            events = events.len(),
            items = self.cart.item_count(),
            total = self.cart.total(),
            "cart updated"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use storefront_catalog::LocalCatalog;
    use storefront_events::InMemoryEventBus;
    use storefront_storage::{InMemoryStore, KeyValueStore};

    use crate::persistence::{CART_KEY, StorageCartPersistence};

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    fn product(id: &str, price: u64) -> Product {
        Product::new(pid(id), format!("Fabric {id}"), price)
    }

    struct Env {
        storage: Arc<InMemoryStore>,
        persistence: Arc<StorageCartPersistence>,
        bus: Arc<InMemoryEventBus>,
    }

    impl Env {
        fn new() -> Self {
            let storage = Arc::new(InMemoryStore::new());
            Self {
                persistence: Arc::new(StorageCartPersistence::new(storage.clone())),
                storage,
                bus: Arc::new(InMemoryEventBus::new()),
            }
        }

        fn store(&self) -> CartStore {
            CartStore::init(self.persistence.clone(), self.bus.clone())
        }
    }

    #[test]
    fn mutations_persist_and_announce() {
        let env = Env::new();
        let sub = env.bus.subscribe_channel(Topic::CartChanged);
        let mut store = env.store();

        assert!(store.add_to_cart(&product("A", 100)).unwrap());
        assert!(store.update_quantity(&pid("A"), 3).unwrap());

        let notes = sub.drain();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.origin() == Some(store.session())));

        let reloaded = env.persistence.load(SessionId::new());
        assert_eq!(reloaded.item_count(), 3);
    }

    #[test]
    fn noops_neither_save_nor_announce() {
        let env = Env::new();
        let sub = env.bus.subscribe_channel(Topic::CartChanged);
        let mut store = env.store();

        assert!(!store.remove_from_cart(&pid("ghost")).unwrap());
        assert!(!store.update_quantity(&pid("ghost"), 2).unwrap());
        assert!(!store.clear_cart().unwrap());

        assert!(sub.drain().is_empty());
        assert!(env.storage.get(CART_KEY).unwrap().is_none());
    }

    #[test]
    fn rejected_mutation_leaves_cart_unchanged() {
        let env = Env::new();
        let mut store = env.store();
        store.add_to_cart(&product("A", 100)).unwrap();
        let before = store.cart().clone();

        let err = store
            .update_quantity(&pid("A"), i64::from(u32::MAX) + 1)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(store.cart(), &before);
    }

    #[test]
    fn empty_non_empty_transitions() {
        let env = Env::new();
        let mut store = env.store();
        assert!(store.is_empty());

        store.add_to_cart(&product("A", 100)).unwrap();
        assert!(!store.is_empty());

        store.update_quantity(&pid("A"), 0).unwrap();
        assert!(store.is_empty());
        assert!(env.storage.get(CART_KEY).unwrap().is_none());
    }

    #[test]
    fn restores_persisted_cart_on_init() {
        let env = Env::new();
        let mut first = env.store();
        first.add_to_cart(&product("A", 100)).unwrap();
        first.add_to_cart(&product("B", 50)).unwrap();
        first.dispose();

        let second = env.store();
        let ids: Vec<&str> = second.lines().iter().map(|l| l.product_id().as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn foreign_change_is_picked_up_before_next_mutation() {
        let env = Env::new();
        let mut tab_a = env.store();
        let mut tab_b = env.store();

        tab_a.add_to_cart(&product("A", 100)).unwrap();
        assert!(tab_b.is_stale());
        assert!(!tab_a.is_stale());

        tab_b.add_to_cart(&product("B", 50)).unwrap();
        assert_eq!(tab_b.item_count(), 2);

        // tab_a now sees tab_b's write on its next mutation.
        tab_a.add_to_cart(&product("A", 100)).unwrap();
        assert_eq!(tab_a.item_count(), 3);
        assert_eq!(env.persistence.load(SessionId::new()).item_count(), 3);
    }

    #[test]
    fn without_shared_notifications_last_writer_wins() {
        let storage = Arc::new(InMemoryStore::new());
        let persistence: Arc<dyn CartPersistence> =
            Arc::new(StorageCartPersistence::new(storage.clone()));
        let mut tab_a = CartStore::init(persistence.clone(), Arc::new(InMemoryEventBus::new()));
        let mut tab_b = CartStore::init(persistence.clone(), Arc::new(InMemoryEventBus::new()));

        tab_a.add_to_cart(&product("A", 100)).unwrap();
        tab_b.add_to_cart(&product("B", 50)).unwrap();

        let persisted = persistence.load(SessionId::new());
        assert_eq!(persisted.lines().len(), 1);
        assert_eq!(persisted.lines()[0].product_id().as_str(), "B");
    }

    #[test]
    fn disposed_store_stops_listening() {
        let env = Env::new();
        let store = env.store();
        assert_eq!(env.bus.handler_count(Topic::CartChanged), 1);
        store.dispose();
        assert_eq!(env.bus.handler_count(Topic::CartChanged), 0);

        let dropped = env.store();
        drop(dropped);
        assert_eq!(env.bus.handler_count(Topic::CartChanged), 0);
    }

    #[test]
    fn save_failure_keeps_in_memory_mutation() {
        let env = Env::new();
        let mut store = env.store();
        env.storage.set_unavailable(true);

        assert!(store.add_to_cart(&product("A", 100)).unwrap());
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.cart_total(), 100);
    }

    #[test]
    fn snapshot_is_isolated_from_catalog_edits() {
        let env = Env::new();
        let mut store = env.store();
        let mut p = product("A", 100);
        store.add_to_cart(&p).unwrap();

        p.price = 5_000;
        p.name = "Renamed".to_string();

        let line = store.cart().line(&pid("A")).unwrap();
        assert_eq!(line.product().price, 100);
        assert_eq!(line.product().name, "Fabric A");
    }

    #[test]
    fn add_by_id_goes_through_the_catalog() {
        let env = Env::new();
        let catalog = LocalCatalog::open(env.storage.clone(), env.bus.clone()).unwrap();
        let mut store = env.store();

        assert!(store.add_by_id(&catalog, &pid("1")).unwrap());
        assert_eq!(store.cart_total(), 7999);

        let err = store.add_by_id(&catalog, &pid("missing")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn badge_subscriber_sees_current_count() {
        let env = Env::new();
        let mut store = env.store();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let persistence = env.persistence.clone();
        let sink = seen.clone();
        let _badge = env.bus.subscribe(
            Topic::CartChanged,
            Box::new(move |_: &Notification| -> anyhow::Result<()> {
                let count = persistence.load(SessionId::new()).item_count();
                sink.lock().unwrap().push(count);
                Ok(())
            }),
        );

        store.add_to_cart(&product("A", 100)).unwrap();
        store.add_to_cart(&product("A", 100)).unwrap();
        store.clear_cart().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 0]);
    }
}
