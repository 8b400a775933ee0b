//! Durable cart storage.
//!
//! The cart lives under a single key as a JSON envelope
//! `{"version":1,"lines":[...]}`. A bare array of lines (the older shape) is
//! still accepted on load.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, SessionId};
use storefront_storage::KeyValueStore;

use crate::cart::{Cart, CartLine};

pub const CART_KEY: &str = "sam_fabrics_cart";
pub const CART_FORMAT_VERSION: u32 = 1;

/// Load/save seam between the cart store and durable storage.
///
/// `load` and `save` are best-effort: failures are logged and the in-memory
/// cart stays authoritative. Use the `try_` variants to observe the error.
pub trait CartPersistence: Send + Sync {
    fn try_load(&self, session: SessionId) -> Result<Cart, DomainError>;

    fn try_save(&self, cart: &Cart) -> Result<(), DomainError>;

    /// Never fails; unreadable or missing data yields an empty cart.
    fn load(&self, session: SessionId) -> Cart {
        self.try_load(session).unwrap_or_else(|err| {
            tracing::warn!(%session, "could not load cart, starting empty: {err}");
            Cart::new(session)
        })
    }

    fn save(&self, cart: &Cart) {
        if let Err(err) = self.try_save(cart) {
            tracing::error!(session = %cart.session(), "could not persist cart: {err}");
        }
    }
}

impl<P> CartPersistence for Arc<P>
where
    P: CartPersistence + ?Sized,
{
    fn try_load(&self, session: SessionId) -> Result<Cart, DomainError> {
        (**self).try_load(session)
    }

    fn try_save(&self, cart: &Cart) -> Result<(), DomainError> {
        (**self).try_save(cart)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    lines: &'a [CartLine],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Envelope {
        version: u32,
        lines: Vec<serde_json::Value>,
    },
    Legacy(Vec<serde_json::Value>),
}

/// [`CartPersistence`] over any [`KeyValueStore`].
pub struct StorageCartPersistence {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl core::fmt::Debug for StorageCartPersistence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StorageCartPersistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl StorageCartPersistence {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(storage, CART_KEY)
    }

    pub fn with_key(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn decode(&self, session: SessionId, raw: &str) -> Cart {
        let entries = match serde_json::from_str::<Stored>(raw) {
            Ok(Stored::Envelope { version, lines }) => {
                if version != CART_FORMAT_VERSION {
                    tracing::warn!(version, "unknown cart format version; reading lines anyway");
                }
                lines
            }
            Ok(Stored::Legacy(lines)) => lines,
            Err(err) => {
                tracing::warn!(key = %self.key, "stored cart is unreadable; treating as empty: {err}");
                return Cart::new(session);
            }
        };

        let lines = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<CartLine>(entry) {
                Ok(line) if line.quantity() > 0 => Some(line),
                Ok(line) => {
                    tracing::warn!(product_id = %line.product_id(), "discarding stored cart line with zero quantity");
                    None
                }
                Err(err) => {
                    tracing::warn!("discarding malformed stored cart line: {err}");
                    None
                }
            });

        Cart::from_lines(session, lines)
    }
}

impl CartPersistence for StorageCartPersistence {
    fn try_load(&self, session: SessionId) -> Result<Cart, DomainError> {
        match self.storage.get(&self.key)? {
            Some(raw) => Ok(self.decode(session, &raw)),
            None => Ok(Cart::new(session)),
        }
    }

    fn try_save(&self, cart: &Cart) -> Result<(), DomainError> {
        if cart.is_empty() {
            self.storage.remove(&self.key)?;
            return Ok(());
        }

        let raw = serde_json::to_string(&EnvelopeRef {
            version: CART_FORMAT_VERSION,
            lines: cart.lines(),
        })
        .map_err(|e| DomainError::persistence(format!("failed to encode cart: {e}")))?;

        self.storage.set(&self.key, &raw)?;
        tracing::debug!(key = %self.key, lines = cart.lines().len(), "cart persisted");
        Ok(())
    }
}
