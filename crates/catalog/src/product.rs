use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Entity, ProductId};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_FABRIC: &str = "Unknown";

fn enabled_by_default() -> bool {
    true
}

/// Catalog product.
///
/// Prices are whole currency units (rupees) and must be non-negative
/// integers; an entry carrying a fractional price fails to decode and is
/// skipped by [`decode_listing`]. The wire shape (camelCase JSON) matches what
/// the storefront API returns, so absent optional fields deserialize to
/// "no sale price", "no images" and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fabric: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<u64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Minimal enabled product; used by seeds and tests.
    pub fn new(id: ProductId, name: impl Into<String>, price: u64) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category: String::new(),
            fabric: String::new(),
            price,
            sale_price: None,
            images: Vec::new(),
            enabled: true,
            sort_order: 0,
            featured: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_sale_price(mut self, sale_price: u64) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Price a shopper pays: the sale price when present, otherwise the base price.
    ///
    /// A sale price above the base price is honoured as-is.
    pub fn effective_price(&self) -> u64 {
        self.sale_price.unwrap_or(self.price)
    }

    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }

    /// Fill display defaults and drop a zero sale price.
    pub fn normalized(mut self) -> Self {
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
        if self.fabric.trim().is_empty() {
            self.fabric = DEFAULT_FABRIC.to_string();
        }
        if self.sale_price == Some(0) {
            self.sale_price = None;
        }
        if let Some(sale) = self.sale_price.filter(|sale| *sale > self.price) {
            tracing::warn!(product_id = %self.id, sale, price = self.price, "sale price exceeds base price");
        }
        self
    }
}

/// Decode a product listing entry by entry, skipping (and logging) entries
/// that do not decode so one bad record never hides the rest.
pub fn decode_listing(entries: Vec<serde_json::Value>) -> Vec<Product> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Product>(entry) {
            Ok(product) => Some(product.normalized()),
            Err(err) => {
                tracing::warn!("skipping malformed product: {err}");
                None
            }
        })
        .collect()
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a product; the catalog assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fabric: String,
    pub price: u64,
    #[serde(default)]
    pub sale_price: Option<u64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub featured: bool,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            fabric: String::new(),
            price,
            sale_price: None,
            images: Vec::new(),
            enabled: true,
            sort_order: 0,
            featured: false,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_argument("product name cannot be empty"));
        }
        Ok(())
    }

    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            fabric: self.fabric,
            price: self.price,
            sale_price: self.sale_price,
            images: self.images,
            enabled: self.enabled,
            sort_order: self.sort_order,
            featured: self.featured,
            created_at,
        }
    }
}

/// Partial update. `id` and `created_at` are never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub fabric: Option<String>,
    pub price: Option<u64>,
    /// `Some(None)` clears the sale price.
    pub sale_price: Option<Option<u64>>,
    pub images: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i64>,
    pub featured: Option<bool>,
}

impl ProductPatch {
    pub fn apply_to(self, product: &mut Product) -> Result<(), DomainError> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(DomainError::invalid_argument("product name cannot be empty"));
            }
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(fabric) = self.fabric {
            product.fabric = fabric;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(sale_price) = self.sale_price {
            product.sale_price = sale_price;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(enabled) = self.enabled {
            product.enabled = enabled;
        }
        if let Some(sort_order) = self.sort_order {
            product.sort_order = sort_order;
        }
        if let Some(featured) = self.featured {
            product.featured = featured;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    #[test]
    fn effective_price_prefers_sale_price() {
        let plain = Product::new(pid("2"), "Royal Gold Lawn", 4500);
        assert_eq!(plain.effective_price(), 4500);
        assert!(!plain.is_on_sale());

        let sale = Product::new(pid("1"), "Midnight Velvet Luxury", 8500).with_sale_price(7999);
        assert_eq!(sale.effective_price(), 7999);
        assert!(sale.is_on_sale());
    }

    #[test]
    fn sale_price_above_base_is_allowed() {
        let odd = Product::new(pid("x"), "Odd", 100).with_sale_price(150).normalized();
        assert_eq!(odd.effective_price(), 150);
        assert!(!odd.is_on_sale());
    }

    #[test]
    fn normalization_fills_defaults_and_drops_zero_sale() {
        let p = Product::new(pid("4"), "Emerald Jacquard", 6500)
            .with_sale_price(0)
            .normalized();
        assert_eq!(p.category, DEFAULT_CATEGORY);
        assert_eq!(p.fabric, DEFAULT_FABRIC);
        assert_eq!(p.sale_price, None);
    }

    #[test]
    fn deserializes_api_shape_with_missing_optionals() {
        let json = r#"{
            "id": "65f1c0",
            "name": "Crimson Rose Festivity",
            "price": 12000,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.sale_price, None);
        assert!(p.images.is_empty());
        assert!(p.enabled);
        assert!(!p.featured);
    }

    #[test]
    fn deserialization_rejects_blank_ids() {
        let json = r#"{"id": "", "name": "x", "price": 1}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }

    #[test]
    fn fractional_prices_are_rejected() {
        let json = r#"{"id": "b", "name": "Half Rupee", "price": 1299.5}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }

    #[test]
    fn listing_keeps_valid_entries_around_a_bad_one() {
        let entries: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"id": "a", "name": "Royal Gold Lawn", "price": 4500},
                {"id": "b", "name": "Half Rupee", "price": 1299.5},
                {"id": "c", "name": "Teal Bloom Lawn", "price": 3800, "salePrice": 0}
            ]"#,
        )
        .unwrap();

        let products = decode_listing(entries);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(products[1].sale_price, None);
        assert_eq!(products[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let mut p = Product::new(pid("8"), "Teal Bloom Lawn", 3800).with_sale_price(3200);
        ProductPatch {
            price: Some(4000),
            sale_price: Some(None),
            ..ProductPatch::default()
        }
        .apply_to(&mut p)
        .unwrap();

        assert_eq!(p.name, "Teal Bloom Lawn");
        assert_eq!(p.price, 4000);
        assert_eq!(p.sale_price, None);
    }

    #[test]
    fn patch_rejects_blank_name() {
        let mut p = Product::new(pid("8"), "Teal Bloom Lawn", 3800);
        let err = ProductPatch {
            name: Some(" ".to_string()),
            ..ProductPatch::default()
        }
        .apply_to(&mut p)
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(p.name, "Teal Bloom Lawn");
    }
}
