use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart::{Cart, CartLine};
use storefront_core::{DomainError, Entity, OrderId, ValueObject};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact fields collected by the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address: String,
}

impl ValueObject for CustomerDetails {}

impl CustomerDetails {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: name.into(),
            customer_email: email.into(),
            customer_phone: phone.into(),
            address: address.into(),
        }
    }

    /// Every field is required; the email must at least look like one.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("customer name", &self.customer_name),
            ("customer email", &self.customer_email),
            ("customer phone", &self.customer_phone),
            ("address", &self.address),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(DomainError::invalid_argument(format!("{field} is required")));
        }
        if !self.customer_email.contains('@') {
            return Err(DomainError::invalid_argument("customer email is not valid"));
        }
        Ok(())
    }
}

/// What is sent to order capture: contact fields, cart lines and total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub items: Vec<CartLine>,
    pub total: u64,
}

impl OrderRequest {
    /// Copy of the cart's lines and its total at this instant.
    pub fn from_cart(customer: CustomerDetails, cart: &Cart) -> Self {
        Self {
            customer,
            items: cart.lines().to_vec(),
            total: cart.total(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.customer.validate()?;
        if self.items.is_empty() {
            return Err(DomainError::invalid_argument("order has no items"));
        }
        Ok(())
    }
}

/// A captured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub items: Vec<CartLine>,
    pub total: u64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// New `Pending` order from an accepted request.
    pub fn place(id: OrderId, request: OrderRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer: request.customer,
            items: request.items,
            total: request.total,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|l| u64::from(l.quantity())).sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
