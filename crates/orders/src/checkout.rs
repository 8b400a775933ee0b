use storefront_cart::CartStore;
use storefront_core::{DomainError, DomainResult};

use crate::capture::OrderCapture;
use crate::order::{CustomerDetails, Order, OrderRequest};

/// Submit the store's cart as an order.
///
/// On success the cart is cleared exactly once (which persists the empty cart
/// and announces `cartChanged`). On any failure the cart is left exactly as
/// it was and the error is returned: invalid customer details and an empty
/// cart as `InvalidArgument`, capture failures as the retryable
/// `OrderSubmissionFailed`.
pub fn checkout(
    store: &mut CartStore,
    capture: &dyn OrderCapture,
    customer: CustomerDetails,
) -> DomainResult<Order> {
    customer.validate()?;

    store.refresh_if_stale();
    if store.is_empty() {
        return Err(DomainError::invalid_argument("cannot check out an empty cart"));
    }

    let request = OrderRequest::from_cart(customer, store.cart());
    let order = capture.submit(request).map_err(|err| {
        tracing::warn!(capture = capture.name(), session = %store.session(), "order submission failed: {err}");
        DomainError::order_submission(err.to_string())
    })?;

    store.clear_cart()?;

    tracing::info!(
        order_id = %order.id,
        total = order.total,
        items = order.item_count(),
        capture = capture.name(),
        "order placed"
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use storefront_cart::StorageCartPersistence;
    use storefront_catalog::Product;
    use storefront_core::ProductId;
    use storefront_events::{EventBus, InMemoryEventBus, Topic};
    use storefront_storage::InMemoryStore;

    use crate::capture::{LocalOrderCapture, OrderCaptureError};
    use crate::order::OrderStatus;

    /// Capture double that counts calls and can be told to fail.
    struct Scripted {
        fail: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OrderCapture for Scripted {
        fn submit(&self, request: OrderRequest) -> Result<Order, OrderCaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(OrderCaptureError::Unavailable("connection refused".to_string()));
            }
            Ok(Order::place(
                storefront_core::OrderId::generate(),
                request,
                chrono::Utc::now(),
            ))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn customer() -> CustomerDetails {
        CustomerDetails::new("Hira", "hira@example.com", "0321 1234567", "House 4, Islamabad")
    }

    fn setup() -> (CartStore, Arc<InMemoryEventBus>, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let store = CartStore::init(
            Arc::new(StorageCartPersistence::new(storage.clone())),
            bus.clone(),
        );
        (store, bus, storage)
    }

    fn fill(store: &mut CartStore) {
        let a = Product::new(ProductId::new("A").unwrap(), "Lawn A", 100);
        let b = Product::new(ProductId::new("B").unwrap(), "Chiffon B", 50).with_sale_price(40);
        store.add_to_cart(&a).unwrap();
        store.add_to_cart(&a).unwrap();
        store.add_to_cart(&b).unwrap();
    }

    #[test]
    fn success_clears_cart_once_and_announces() {
        let (mut store, bus, _storage) = setup();
        fill(&mut store);
        let sub = bus.subscribe_channel(Topic::CartChanged);
        let capture = Scripted::new(false);

        let order = checkout(&mut store, &capture, customer()).unwrap();

        assert_eq!(order.total, 240);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.item_count(), 0);
        assert_eq!(capture.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sub.drain().len(), 1);
    }

    #[test]
    fn failure_leaves_cart_untouched_and_is_retryable() {
        let (mut store, bus, _storage) = setup();
        fill(&mut store);
        let before = store.cart().clone();
        let sub = bus.subscribe_channel(Topic::CartChanged);

        let err = checkout(&mut store, &Scripted::new(true), customer()).unwrap_err();

        assert!(matches!(err, DomainError::OrderSubmissionFailed(_)));
        assert!(err.is_retryable());
        assert_eq!(store.cart().lines(), before.lines());
        assert_eq!(store.cart_total(), 240);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn retry_after_failure_succeeds() {
        let (mut store, _bus, _storage) = setup();
        fill(&mut store);

        assert!(checkout(&mut store, &Scripted::new(true), customer()).is_err());
        let order = checkout(&mut store, &Scripted::new(false), customer()).unwrap();
        assert_eq!(order.total, 240);
        assert!(store.is_empty());
    }

    #[test]
    fn empty_cart_is_refused_before_submission() {
        let (mut store, _bus, _storage) = setup();
        let capture = Scripted::new(false);

        let err = checkout(&mut store, &capture, customer()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(capture.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_customer_is_refused_before_submission() {
        let (mut store, _bus, _storage) = setup();
        fill(&mut store);
        let capture = Scripted::new(false);
        let mut details = customer();
        details.address.clear();

        assert!(matches!(
            checkout(&mut store, &capture, details),
            Err(DomainError::InvalidArgument(_))
        ));
        assert_eq!(capture.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.item_count(), 3);
    }

    #[test]
    fn local_capture_records_the_order() {
        let (mut store, _bus, storage) = setup();
        fill(&mut store);
        let capture = LocalOrderCapture::new(storage);

        let order = checkout(&mut store, &capture, customer()).unwrap();
        let recorded = capture.list_orders().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].id, order.id);
        assert_eq!(recorded[0].total, 240);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: a captured order carries exactly the cart's lines and total.
            #[test]
            fn order_matches_cart(quantities in proptest::collection::vec(1i64..20, 1..8)) {
                let (mut store, _bus, _storage) = setup();
                for (i, qty) in quantities.iter().enumerate() {
                    let product = Product::new(ProductId::new(format!("P{i}")).unwrap(), "Fabric", 100 + i as u64);
                    store.add_to_cart(&product).unwrap();
                    store.update_quantity(&product.id, *qty).unwrap();
                }
                let expected_lines = store.cart().lines().to_vec();
                let expected_total = store.cart_total();

                let order = checkout(&mut store, &Scripted::new(false), customer()).unwrap();

                prop_assert_eq!(order.items, expected_lines);
                prop_assert_eq!(order.total, expected_total);
                prop_assert!(store.is_empty());
            }
        }
    }
}
