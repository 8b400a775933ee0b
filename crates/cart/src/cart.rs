use serde::{Deserialize, Serialize};

use storefront_catalog::Product;
use storefront_core::{Aggregate, AggregateRoot, DomainError, ProductId, SessionId, ValueObject};
use storefront_events::Event;

/// The displayable fields of a product, captured when it is added to a cart.
///
/// Later catalog edits do not change lines already in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<u64>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ValueObject for ProductSnapshot {}

impl ProductSnapshot {
    /// Sale price when present, otherwise the base price.
    pub fn unit_price(&self) -> u64 {
        self.sale_price.unwrap_or(self.price)
    }
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            sale_price: product.sale_price,
            images: product.images.clone(),
        }
    }
}

/// One product entry in the cart.
///
/// Serialized flat (product fields plus `quantity`), the same shape the
/// storefront has always kept for cart items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    product: ProductSnapshot,
    quantity: u32,
}

impl CartLine {
    /// Quantity must be positive.
    pub fn new(product: ProductSnapshot, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument("cart line quantity must be positive"));
        }
        Ok(Self { product, quantity })
    }

    pub fn product(&self) -> &ProductSnapshot {
        &self.product
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> u64 {
        self.product.unit_price().saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    AddProduct(ProductSnapshot),
    RemoveProduct(ProductId),
    /// Set the quantity exactly; zero or below removes the line.
    UpdateQuantity { product_id: ProductId, quantity: i64 },
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    LineAdded { product: ProductSnapshot },
    QuantityIncremented { product_id: ProductId },
    QuantityChanged { product_id: ProductId, quantity: u32 },
    LineRemoved { product_id: ProductId },
    Cleared,
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::LineAdded { .. } => "cart.line_added",
            CartEvent::QuantityIncremented { .. } => "cart.quantity_incremented",
            CartEvent::QuantityChanged { .. } => "cart.quantity_changed",
            CartEvent::LineRemoved { .. } => "cart.line_removed",
            CartEvent::Cleared => "cart.cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

/// Aggregate root: the shopping cart of one session.
///
/// Lines keep insertion order and there is at most one line per product id.
/// `item_count` and `total` are recomputed from the lines on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    session: SessionId,
    lines: Vec<CartLine>,
    version: u64,
}

impl Cart {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            lines: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild a cart from stored lines, merging duplicate product ids into
    /// the first occurrence.
    pub fn from_lines(session: SessionId, lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new(session);
        for line in lines {
            match cart.position(line.product_id()) {
                Some(idx) => {
                    let existing = &mut cart.lines[idx];
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all quantities.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum over lines of quantity × (sale price, else price).
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.line_total()))
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id() == product_id)
    }
}

impl AggregateRoot for Cart {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.session
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::LineAdded { product } => {
                self.lines.push(CartLine {
                    product: product.clone(),
                    quantity: 1,
                });
            }
            CartEvent::QuantityIncremented { product_id } => {
                if let Some(idx) = self.position(product_id) {
                    let line = &mut self.lines[idx];
                    line.quantity = line.quantity.saturating_add(1);
                }
            }
            CartEvent::QuantityChanged {
                product_id,
                quantity,
            } => {
                if let Some(idx) = self.position(product_id) {
                    self.lines[idx].quantity = *quantity;
                }
            }
            CartEvent::LineRemoved { product_id } => {
                self.lines.retain(|l| l.product_id() != product_id);
            }
            CartEvent::Cleared => self.lines.clear(),
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddProduct(product) => self.handle_add(product),
            CartCommand::RemoveProduct(product_id) => Ok(self.handle_remove(product_id)),
            CartCommand::UpdateQuantity {
                product_id,
                quantity,
            } => self.handle_update(product_id, *quantity),
            CartCommand::Clear => Ok(self.handle_clear()),
        }
    }
}

impl Cart {
    fn handle_add(&self, product: &ProductSnapshot) -> Result<Vec<CartEvent>, DomainError> {
        match self.line(&product.id) {
            Some(line) if line.quantity == u32::MAX => Err(DomainError::invalid_argument(
                format!("quantity of '{}' cannot grow further", product.id),
            )),
            Some(_) => Ok(vec![CartEvent::QuantityIncremented {
                product_id: product.id.clone(),
            }]),
            None => Ok(vec![CartEvent::LineAdded {
                product: product.clone(),
            }]),
        }
    }

    fn handle_remove(&self, product_id: &ProductId) -> Vec<CartEvent> {
        if self.line(product_id).is_none() {
            return vec![];
        }
        vec![CartEvent::LineRemoved {
            product_id: product_id.clone(),
        }]
    }

    fn handle_update(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartEvent>, DomainError> {
        let Some(line) = self.line(product_id) else {
            return Ok(vec![]);
        };

        if quantity <= 0 {
            return Ok(self.handle_remove(product_id));
        }

        let quantity = u32::try_from(quantity).map_err(|_| {
            DomainError::invalid_argument(format!("quantity {quantity} is out of range"))
        })?;

        if line.quantity == quantity {
            return Ok(vec![]);
        }

        Ok(vec![CartEvent::QuantityChanged {
            product_id: product_id.clone(),
            quantity,
        }])
    }

    fn handle_clear(&self) -> Vec<CartEvent> {
        if self.is_empty() {
            return vec![];
        }
        vec![CartEvent::Cleared]
    }
}
