//! Notification publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **notification bus** - a pub/sub mechanism that lets
//! independent parts of the storefront (the header's cart badge, admin views,
//! other cart-store instances) learn that cart or catalog state changed without
//! being wired to the component that changed it.
//!
//! ## Delivery Model
//!
//! - **Synchronous**: `publish` returns after every callback handler has run.
//! - **Registration order**: handlers for a topic are invoked in the order they
//!   subscribed.
//! - **No replay**: a handler registered after a publish never sees that publish.
//! - **Failure isolation**: a handler that returns an error (or panics) is logged
//!   and skipped; later handlers still receive the notification.
//!
//! Notifications carry no state, only "something changed". Subscribers re-read
//! what they need, so a duplicate delivery is harmless.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use thiserror::Error;

use crate::notification::{Notification, Topic};

/// Callback invoked for each matching notification.
pub type Handler = Box<dyn Fn(&Notification) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    #[error("notification bus lock poisoned")]
    Poisoned,
}

/// Outcome of a single `publish`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Callback handlers that ran to completion.
    pub delivered: usize,
    /// Callback handlers that returned an error or panicked.
    pub failed: usize,
}

/// A channel subscription to one topic.
///
/// For consumers that poll (a worker thread, a test) rather than register a
/// callback. Each subscription gets its own copy of every matching notification
/// published after it was created.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Unsubscribe handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle unsubscribes. Call [`SubscriptionHandle::detach`] to keep
/// the handler registered for the lifetime of the bus.
#[must_use = "dropping the handle unsubscribes the handler immediately"]
pub struct SubscriptionHandle {
    topic: Topic,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SubscriptionHandle {
    pub fn new(topic: Topic, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            topic,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove the handler now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Leave the handler registered; the handle no longer controls it.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl core::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Process-wide notification bus (pub/sub abstraction).
///
/// The bus is injected into the components that publish (cart store, local
/// catalog) and the ones that listen, rather than reached through a global.
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync` so one bus can be shared behind an `Arc`.
/// Implementations must not hold internal locks while invoking handlers, so a
/// handler may itself publish or (un)subscribe.
pub trait EventBus: Send + Sync {
    /// Deliver `notification` to every handler and channel currently subscribed
    /// to its topic.
    fn publish(&self, notification: Notification) -> Result<Delivery, BusError>;

    /// Register a callback for `topic`.
    fn subscribe(&self, topic: Topic, handler: Handler) -> SubscriptionHandle;

    /// Register a channel for `topic`. The channel is dropped from the bus once
    /// its receiving side is gone.
    fn subscribe_channel(&self, topic: Topic) -> Subscription<Notification>;

    /// Publish a bare notification for `topic`.
    fn notify(&self, topic: Topic) -> Result<Delivery, BusError> {
        self.publish(Notification::new(topic))
    }
}

impl<B> EventBus for Arc<B>
where
    B: EventBus + ?Sized,
{
    fn publish(&self, notification: Notification) -> Result<Delivery, BusError> {
        (**self).publish(notification)
    }

    fn subscribe(&self, topic: Topic, handler: Handler) -> SubscriptionHandle {
        (**self).subscribe(topic, handler)
    }

    fn subscribe_channel(&self, topic: Topic) -> Subscription<Notification> {
        (**self).subscribe_channel(topic)
    }
}
