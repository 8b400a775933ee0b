//! Shopping cart: the cart aggregate, its persistence adapter, and the store
//! that ties them to the notification bus.
//!
//! The cart itself is pure deterministic logic (no IO). [`CartStore`] is the
//! only mutation surface the rest of the storefront uses: it runs each command
//! through the aggregate, saves the result best-effort, and announces
//! `Topic::CartChanged`.

pub mod cart;
pub mod persistence;
pub mod store;

pub use cart::{Cart, CartCommand, CartEvent, CartLine, ProductSnapshot};
pub use persistence::{CART_KEY, CartPersistence, StorageCartPersistence};
pub use store::CartStore;
