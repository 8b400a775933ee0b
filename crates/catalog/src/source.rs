use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, ProductId};
use storefront_storage::StorageError;

use crate::product::Product;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product '{0}' not found")]
    NotFound(ProductId),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    /// The backing source could not be reached or returned garbage.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        CatalogError::InvalidProduct(value.to_string())
    }
}

impl From<CatalogError> for DomainError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(_) => DomainError::not_found(),
            CatalogError::InvalidProduct(msg) => DomainError::invalid_argument(msg),
            CatalogError::Unavailable(msg) => DomainError::persistence(msg),
            CatalogError::Storage(err) => err.into(),
        }
    }
}

/// Listing options accepted by [`CatalogSource::get_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    /// Only featured products when `true`; `false` means "don't filter".
    #[serde(default)]
    pub featured: bool,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl CatalogQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        product.enabled
            && (!self.featured || product.featured)
            && self
                .category
                .as_deref()
                .is_none_or(|category| product.category == category)
    }

    /// Filter, order (`sort_order` ascending, newest first within a rank) and
    /// truncate.
    pub fn select(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut selected: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        selected.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Supplier of product records.
///
/// Implementations return records already normalized (see
/// [`Product::normalized`]).
pub trait CatalogSource: Send + Sync {
    fn get_all(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError>;

    fn get_by_id(&self, id: &ProductId) -> Result<Product, CatalogError>;

    /// Short label for logs ("local", "remote").
    fn name(&self) -> &'static str;
}

impl<S> CatalogSource for Arc<S>
where
    S: CatalogSource + ?Sized,
{
    fn get_all(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError> {
        (**self).get_all(query)
    }

    fn get_by_id(&self, id: &ProductId) -> Result<Product, CatalogError> {
        (**self).get_by_id(id)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
