//! In-process notification bus.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak, mpsc};

use crate::bus::{BusError, Delivery, EventBus, Handler, Subscription, SubscriptionHandle};
use crate::notification::{Notification, Topic};

type SharedHandler = Arc<dyn Fn(&Notification) -> anyhow::Result<()> + Send + Sync>;

struct Registration {
    id: u64,
    topic: Topic,
    handler: SharedHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<Registration>,
    channels: Vec<(Topic, mpsc::Sender<Notification>)>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> Option<Registration> {
        let pos = self.handlers.iter().position(|r| r.id == id)?;
        Some(self.handlers.remove(pos))
    }
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Handlers run on the publishing thread, in registration order
/// - The registry lock is released before any handler runs
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    registry: Arc<Mutex<Registry>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callback handlers currently registered for `topic`.
    pub fn handler_count(&self, topic: Topic) -> usize {
        self.registry
            .lock()
            .map(|reg| reg.handlers.iter().filter(|r| r.topic == topic).count())
            .unwrap_or(0)
    }
}

impl core::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (handlers, channels) = self
            .registry
            .lock()
            .map(|reg| (reg.handlers.len(), reg.channels.len()))
            .unwrap_or_default();
        f.debug_struct("InMemoryEventBus")
            .field("handlers", &handlers)
            .field("channels", &channels)
            .finish()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, notification: Notification) -> Result<Delivery, BusError> {
        let topic = notification.topic();

        // Snapshot under the lock; handlers registered from here on miss this publish.
        let handlers: Vec<(u64, SharedHandler)> = {
            let mut reg = self.registry.lock().map_err(|_| BusError::Poisoned)?;

            // Drop any dead channel subscribers while publishing.
            reg.channels
                .retain(|(t, tx)| *t != topic || tx.send(notification.clone()).is_ok());

            reg.handlers
                .iter()
                .filter(|r| r.topic == topic)
                .map(|r| (r.id, Arc::clone(&r.handler)))
                .collect()
        };

        let mut delivery = Delivery::default();
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&notification))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(err)) => {
                    delivery.failed += 1;
                    tracing::warn!(%topic, subscription = id, "notification handler failed: {err:#}");
                }
                Err(_) => {
                    delivery.failed += 1;
                    tracing::error!(%topic, subscription = id, "notification handler panicked");
                }
            }
        }

        tracing::trace!(%topic, delivered = delivery.delivered, failed = delivery.failed, "published");
        Ok(delivery)
    }

    fn subscribe(&self, topic: Topic, handler: Handler) -> SubscriptionHandle {
        let id = match self.registry.lock() {
            Ok(mut reg) => {
                let id = reg.next_id;
                reg.next_id += 1;
                reg.handlers.push(Registration {
                    id,
                    topic,
                    handler: Arc::from(handler),
                });
                id
            }
            Err(_) => {
                // Poisoned: hand back an inert handle; nothing was registered.
                tracing::error!(%topic, "notification bus poisoned; subscription ignored");
                return SubscriptionHandle::new(topic, || {});
            }
        };

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        SubscriptionHandle::new(topic, move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            // Release the lock before the removed handler (and anything it owns) drops.
            let removed = registry.lock().ok().and_then(|mut reg| reg.remove(id));
            drop(removed);
        })
    }

    fn subscribe_channel(&self, topic: Topic) -> Subscription<Notification> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages.
        if let Ok(mut reg) = self.registry.lock() {
            reg.channels.push((topic, tx));
        }

        Subscription::new(rx)
    }
}
