//! Order capture: the collaborator that turns a cart snapshot into a recorded order.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;

use storefront_core::{DomainError, OrderId};
use storefront_storage::{KeyValueStore, StorageError};

use crate::order::{Order, OrderRequest, OrderStatus};

pub const ORDERS_KEY: &str = "sam_fabrics_orders";

#[derive(Debug, Error)]
pub enum OrderCaptureError {
    /// The request was refused (missing fields, no items).
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed.
    #[error("order capture unavailable: {0}")]
    Unavailable(String),

    #[error("order '{0}' not found")]
    NotFound(OrderId),
}

impl From<StorageError> for OrderCaptureError {
    fn from(value: StorageError) -> Self {
        OrderCaptureError::Unavailable(value.to_string())
    }
}

impl From<OrderCaptureError> for DomainError {
    fn from(value: OrderCaptureError) -> Self {
        match value {
            OrderCaptureError::NotFound(_) => DomainError::not_found(),
            other => DomainError::order_submission(other.to_string()),
        }
    }
}

/// Records orders. A returned order has an assigned id and status `Pending`.
pub trait OrderCapture: Send + Sync {
    fn submit(&self, request: OrderRequest) -> Result<Order, OrderCaptureError>;

    /// Short label for logs ("local", "remote").
    fn name(&self) -> &'static str;
}

impl<C> OrderCapture for Arc<C>
where
    C: OrderCapture + ?Sized,
{
    fn submit(&self, request: OrderRequest) -> Result<Order, OrderCaptureError> {
        (**self).submit(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Orders kept in durable client storage, newest first.
///
/// Also serves the back-office order list and status updates.
pub struct LocalOrderCapture {
    storage: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl core::fmt::Debug for LocalOrderCapture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalOrderCapture").finish_non_exhaustive()
    }
}

impl LocalOrderCapture {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Every recorded order, newest first.
    pub fn list_orders(&self) -> Result<Vec<Order>, OrderCaptureError> {
        self.read()
    }

    pub fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderCaptureError> {
        Ok(self
            .read()?
            .into_iter()
            .filter(|o| o.customer.customer_email.eq_ignore_ascii_case(email))
            .collect())
    }

    pub fn get_order(&self, id: &OrderId) -> Result<Order, OrderCaptureError> {
        self.read()?
            .into_iter()
            .find(|o| &o.id == id)
            .ok_or_else(|| OrderCaptureError::NotFound(id.clone()))
    }

    pub fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderCaptureError> {
        let _guard = self.lock()?;

        let mut orders = self.read()?;
        let order = orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| OrderCaptureError::NotFound(id.clone()))?;
        let previous = order.status;
        order.status = status;
        let updated = order.clone();
        self.write(&orders)?;

        tracing::info!(order_id = %id, from = %previous, to = %status, "order status updated");
        Ok(updated)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, OrderCaptureError> {
        self.write_lock
            .lock()
            .map_err(|_| OrderCaptureError::Unavailable("order write lock poisoned".to_string()))
    }

    fn read(&self) -> Result<Vec<Order>, OrderCaptureError> {
        let Some(raw) = self.storage.get(ORDERS_KEY)? else {
            return Ok(Vec::new());
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("stored orders are not a JSON array; treating as empty: {err}");
                return Ok(Vec::new());
            }
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Order>(entry) {
                Ok(order) => Some(order),
                Err(err) => {
                    tracing::warn!("skipping malformed stored order: {err}");
                    None
                }
            })
            .collect())
    }

    fn write(&self, orders: &[Order]) -> Result<(), OrderCaptureError> {
        let raw = serde_json::to_string(orders)
            .map_err(|e| OrderCaptureError::Unavailable(format!("failed to encode orders: {e}")))?;
        self.storage.set(ORDERS_KEY, &raw)?;
        Ok(())
    }
}

impl OrderCapture for LocalOrderCapture {
    fn submit(&self, request: OrderRequest) -> Result<Order, OrderCaptureError> {
        request
            .validate()
            .map_err(|e| OrderCaptureError::Rejected(e.to_string()))?;

        let _guard = self.lock()?;
        let mut orders = self.read()?;
        let order = Order::place(OrderId::generate(), request, Utc::now());
        orders.insert(0, order.clone());
        self.write(&orders)?;

        tracing::info!(order_id = %order.id, total = order.total, "order recorded");
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
