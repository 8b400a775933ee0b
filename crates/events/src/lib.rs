//! State-change events and the process-wide notification bus.
//!
//! - [`Event`] / [`execute`]: the decide-then-apply loop aggregates run through.
//! - [`EventBus`] / [`InMemoryEventBus`]: publish/subscribe for "cart changed"
//!   and "catalog changed" signals between independent UI regions.

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{BusError, Delivery, EventBus, Handler, Subscription, SubscriptionHandle};
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::InMemoryEventBus;
pub use notification::{Notification, Topic};
