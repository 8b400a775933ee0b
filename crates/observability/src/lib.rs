//! Process-wide logging setup shared by the storefront binaries.

pub mod tracing;

pub use self::tracing::{LogFormat, init, init_with};
