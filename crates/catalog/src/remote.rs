//! Remote-API-backed catalog (`GET /products`, `GET /products/{id}`).

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use storefront_core::ProductId;

use crate::product::{Product, decode_listing};
use crate::source::{CatalogError, CatalogQuery, CatalogSource};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Catalog served by the storefront HTTP API.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    client: Client,
    api_url: String,
}

impl RemoteCatalog {
    pub fn new(api_url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_timeout(api_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn query_params(query: &CatalogQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if query.featured {
            params.push(("featured", "true".to_string()));
        }
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

impl CatalogSource for RemoteCatalog {
    fn get_all(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError> {
        let url = format!("{}/products", self.api_url);
        let resp = self
            .client
            .get(&url)
            .query(&Self::query_params(query))
            .send()
            .map_err(|e| CatalogError::Unavailable(format!("network error: {e}")))?;

        if !resp.status().is_success() {
            return Err(CatalogError::Unavailable(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        let entries: Vec<serde_json::Value> = resp
            .json()
            .map_err(|e| CatalogError::Unavailable(format!("parse error: {e}")))?;
        let received = entries.len();
        let products = decode_listing(entries);
        tracing::debug!(received, kept = products.len(), "fetched remote catalog");
        Ok(products)
    }

    fn get_by_id(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let url = format!("{}/products/{}", self.api_url, id);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CatalogError::Unavailable(format!("network error: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(id.clone())),
            status if !status.is_success() => Err(CatalogError::Unavailable(format!(
                "GET {url} returned {status}"
            ))),
            _ => {
                let product: Product = resp
                    .json()
                    .map_err(|e| CatalogError::Unavailable(format!("parse error: {e}")))?;
                Ok(product.normalized())
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
