//! Storefront composition root.
//!
//! [`Storefront`] wires storage, the notification bus, the catalog, the cart
//! store and order capture from a [`StorefrontConfig`].

pub mod config;
pub mod context;

pub use config::{CatalogBackend, StorageBackend, StorefrontConfig};
pub use context::Storefront;
