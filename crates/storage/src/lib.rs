//! Durable client-side key/value storage.
//!
//! The storefront keeps its cart (and, with the local catalog, its products)
//! in a small string store scoped to one client profile, the way a browser
//! keeps `localStorage`. Capacity is finite and writes can be rejected.

pub mod file;
pub mod in_memory;
pub mod store;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use store::{KeyValueStore, StorageError};
