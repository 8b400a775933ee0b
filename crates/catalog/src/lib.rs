//! Product catalog: the `Product` record and the sources that supply it.
//!
//! Two interchangeable sources implement [`CatalogSource`]:
//! - [`LocalCatalog`]: products cached in durable client storage, with the
//!   administrative create/update/delete operations.
//! - `RemoteCatalog` (feature `remote`): the storefront HTTP API.
//!
//! Consumers (the cart, display code) depend only on the trait; which source
//! answers is decided once at startup.

pub mod local;
pub mod product;
pub mod seed;
pub mod source;

#[cfg(feature = "remote")]
pub mod remote;

pub use local::LocalCatalog;
pub use product::{Product, ProductDraft, ProductPatch};
pub use source::{CatalogError, CatalogQuery, CatalogSource};

#[cfg(feature = "remote")]
pub use remote::RemoteCatalog;
