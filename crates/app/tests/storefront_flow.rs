//! End-to-end flows over a fully wired storefront.

use std::sync::Arc;

use storefront_app::{StorageBackend, Storefront, StorefrontConfig};
use storefront_catalog::{CatalogQuery, ProductDraft, ProductPatch};
use storefront_core::{DomainError, ProductId};
use storefront_events::{EventBus, InMemoryEventBus, Topic};
use storefront_orders::{CustomerDetails, OrderStatus};
use storefront_storage::{InMemoryStore, KeyValueStore};

fn pid(s: &str) -> ProductId {
    ProductId::new(s).unwrap()
}

fn customer() -> CustomerDetails {
    CustomerDetails::new(
        "Maryam Ali",
        "maryam@example.com",
        "+92 333 1112223",
        "45-B Gulberg III, Lahore",
    )
}

fn ephemeral() -> Storefront {
    Storefront::init(StorefrontConfig::ephemeral()).unwrap()
}

#[test]
fn browse_add_and_check_out() {
    let mut storefront = ephemeral();
    let cart_changes = storefront.bus().subscribe_channel(Topic::CartChanged);

    let listing = storefront
        .catalog()
        .get_all(&CatalogQuery::all().limit(4))
        .unwrap();
    assert_eq!(listing.len(), 4);
    let pick = listing[0].clone();

    storefront.cart_mut().add_to_cart(&pick).unwrap();
    storefront.cart_mut().add_to_cart(&pick).unwrap();
    let expected_total = 2 * pick.effective_price();
    assert_eq!(storefront.cart().cart_total(), expected_total);

    let order = storefront.checkout(customer()).unwrap();

    assert_eq!(order.total, expected_total);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(storefront.cart().item_count(), 0);
    // two adds + the clear
    assert_eq!(cart_changes.drain().len(), 3);

    let recorded = storefront.admin_orders().unwrap().list_orders().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].id, order.id);

    storefront.dispose();
}

#[test]
fn failed_capture_preserves_cart_for_retry() {
    let storage = Arc::new(InMemoryStore::new());
    let mut storefront =
        Storefront::init_with_storage(StorefrontConfig::ephemeral(), storage.clone()).unwrap();

    let velvet = storefront.catalog().get_by_id(&pid("1")).unwrap();
    storefront.cart_mut().add_to_cart(&velvet).unwrap();
    let before = storefront.cart().cart().clone();

    storage.set_unavailable(true);
    let err = storefront.checkout(customer()).unwrap_err();
    assert!(matches!(err, DomainError::OrderSubmissionFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(storefront.cart().cart(), &before);

    storage.set_unavailable(false);
    let order = storefront.checkout(customer()).unwrap();
    assert_eq!(order.total, velvet.effective_price());
    assert!(storefront.cart().is_empty());
}

#[test]
fn second_tab_sees_first_tab_changes_before_mutating() {
    let mut storefront = ephemeral();
    let mut second_tab = storefront.open_cart_session();

    let lawn = storefront.catalog().get_by_id(&pid("2")).unwrap();
    let chiffon = storefront.catalog().get_by_id(&pid("3")).unwrap();

    storefront.cart_mut().add_to_cart(&lawn).unwrap();
    assert!(second_tab.is_stale());

    second_tab.add_to_cart(&chiffon).unwrap();
    assert_eq!(second_tab.item_count(), 2);

    storefront.cart_mut().update_quantity(&lawn.id, 4).unwrap();
    assert_eq!(storefront.cart().item_count(), 5);

    second_tab.dispose();
    storefront.dispose();
}

#[test]
fn separate_processes_are_last_writer_wins() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let mut tab_a =
        Storefront::init_with_storage(StorefrontConfig::ephemeral(), storage.clone()).unwrap();
    let mut tab_b =
        Storefront::init_with_storage(StorefrontConfig::ephemeral(), storage.clone()).unwrap();

    let lawn = tab_a.catalog().get_by_id(&pid("2")).unwrap();
    let velvet = tab_b.catalog().get_by_id(&pid("1")).unwrap();

    tab_a.cart_mut().add_to_cart(&lawn).unwrap();
    tab_b.cart_mut().add_to_cart(&velvet).unwrap();

    let reopened = Storefront::init_with_storage(StorefrontConfig::ephemeral(), storage).unwrap();
    let ids: Vec<&str> = reopened
        .cart()
        .lines()
        .iter()
        .map(|l| l.product_id().as_str())
        .collect();
    assert_eq!(ids, vec!["1"]);
}

#[test]
fn shared_bus_instances_stay_in_sync() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let mut tab_a =
        Storefront::init_shared(StorefrontConfig::ephemeral(), storage.clone(), bus.clone()).unwrap();
    let mut tab_b = Storefront::init_shared(StorefrontConfig::ephemeral(), storage, bus).unwrap();

    let lawn = tab_a.catalog().get_by_id(&pid("2")).unwrap();
    let velvet = tab_b.catalog().get_by_id(&pid("1")).unwrap();

    tab_a.cart_mut().add_to_cart(&lawn).unwrap();
    tab_b.cart_mut().add_to_cart(&velvet).unwrap();
    tab_a.cart_mut().add_to_cart(&lawn).unwrap();

    assert_eq!(tab_a.cart().item_count(), 3);
    assert_eq!(tab_a.cart().lines().len(), 2);
}

#[test]
fn cart_survives_restart_on_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorefrontConfig {
        data_dir: dir.path().to_path_buf(),
        storage: StorageBackend::File,
        ..StorefrontConfig::ephemeral()
    };

    let mut first = Storefront::init(config.clone()).unwrap();
    let velvet = first.catalog().get_by_id(&pid("1")).unwrap();
    let lawn = first.catalog().get_by_id(&pid("2")).unwrap();
    first.cart_mut().add_to_cart(&lawn).unwrap();
    first.cart_mut().add_to_cart(&velvet).unwrap();
    first.cart_mut().update_quantity(&velvet.id, 3).unwrap();
    let expected: Vec<(String, u32)> = first
        .cart()
        .lines()
        .iter()
        .map(|l| (l.product_id().to_string(), l.quantity()))
        .collect();
    first.dispose();

    let second = Storefront::init(config).unwrap();
    let restored: Vec<(String, u32)> = second
        .cart()
        .lines()
        .iter()
        .map(|l| (l.product_id().to_string(), l.quantity()))
        .collect();
    assert_eq!(restored, expected);
}

#[test]
fn catalog_edits_announce_and_leave_cart_snapshots_alone() {
    let mut storefront = ephemeral();
    let catalog_changes = storefront.bus().subscribe_channel(Topic::CatalogChanged);

    let admin = storefront.admin_catalog().unwrap();
    let created = admin
        .create_product(ProductDraft {
            category: "Lawn".to_string(),
            featured: true,
            ..ProductDraft::new("Sapphire Breeze Lawn", 3500)
        })
        .unwrap();
    let created_id = created.id.clone();

    storefront.cart_mut().add_to_cart(&created).unwrap();

    let admin = storefront.admin_catalog().unwrap();
    admin
        .update_product(
            &created_id,
            ProductPatch {
                price: Some(9_999),
                ..ProductPatch::default()
            },
        )
        .unwrap();

    assert_eq!(catalog_changes.drain().len(), 2);
    assert_eq!(storefront.catalog().get_by_id(&created_id).unwrap().price, 9_999);
    assert_eq!(storefront.cart().cart_total(), 3500);
}

#[test]
fn adding_by_id_resolves_through_the_active_catalog() {
    let mut storefront = ephemeral();

    assert!(storefront.add_to_cart_by_id(&pid("4")).unwrap());
    let line = storefront.cart().cart().line(&pid("4")).unwrap();
    assert_eq!(line.product().name, "Emerald Jacquard");

    let err = storefront.add_to_cart_by_id(&pid("does-not-exist")).unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));
    assert_eq!(storefront.cart().item_count(), 1);
}
