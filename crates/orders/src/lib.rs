//! Orders: the customer-facing order record, the order-capture boundary and
//! the checkout flow that hands a cart to it.
//!
//! - [`LocalOrderCapture`]: orders kept in durable client storage, with the
//!   back-office list and status update.
//! - `HttpOrderCapture` (feature `remote`): the storefront HTTP API.

pub mod capture;
pub mod checkout;
pub mod order;

#[cfg(feature = "remote")]
pub mod http;

pub use capture::{LocalOrderCapture, ORDERS_KEY, OrderCapture, OrderCaptureError};
pub use checkout::checkout;
pub use order::{CustomerDetails, Order, OrderRequest, OrderStatus};

#[cfg(feature = "remote")]
pub use http::HttpOrderCapture;
