//! Order capture over the storefront HTTP API (`POST /orders`).

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;

use storefront_core::OrderId;

use crate::capture::{OrderCapture, OrderCaptureError};
use crate::order::{Order, OrderRequest, OrderStatus};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Body of a `201 Created` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    id: OrderId,
    #[serde(default)]
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpOrderCapture {
    client: Client,
    api_url: String,
}

impl HttpOrderCapture {
    pub fn new(api_url: impl Into<String>) -> Result<Self, OrderCaptureError> {
        Self::with_timeout(api_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OrderCaptureError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrderCaptureError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Orders placed with `email`, newest first.
    pub fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderCaptureError> {
        let url = format!("{}/orders", self.api_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .map_err(|e| OrderCaptureError::Unavailable(format!("network error: {e}")))?;

        if !resp.status().is_success() {
            return Err(OrderCaptureError::Unavailable(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        resp.json()
            .map_err(|e| OrderCaptureError::Unavailable(format!("parse error: {e}")))
    }
}

/// Build the order for a 2xx response.
///
/// The server has already recorded the order, so an unreadable body is not a
/// failure: the order gets a locally generated id and status `Pending`.
fn accepted_order(body: &str, request: OrderRequest) -> Order {
    match serde_json::from_str::<Created>(body) {
        Ok(created) => {
            let mut order = Order::place(created.id, request, Utc::now());
            order.status = created.status;
            order
        }
        Err(err) => {
            let id = OrderId::generate();
            tracing::warn!(order_id = %id, "order accepted but response unreadable: {err}");
            Order::place(id, request, Utc::now())
        }
    }
}

impl OrderCapture for HttpOrderCapture {
    fn submit(&self, request: OrderRequest) -> Result<Order, OrderCaptureError> {
        let url = format!("{}/orders", self.api_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| OrderCaptureError::Unavailable(format!("network error: {e}")))?;

        match resp.status() {
            StatusCode::BAD_REQUEST => {
                let reason = resp
                    .json::<ApiError>()
                    .map(|e| e.error)
                    .unwrap_or_else(|_| "bad request".to_string());
                Err(OrderCaptureError::Rejected(reason))
            }
            status if !status.is_success() => Err(OrderCaptureError::Unavailable(format!(
                "POST {url} returned {status}"
            ))),
            _ => {
                let body = resp.text().unwrap_or_else(|err| {
                    tracing::warn!("failed to read order creation response: {err}");
                    String::new()
                });
                let order = accepted_order(&body, request);
                tracing::info!(order_id = %order.id, total = order.total, "order submitted");
                Ok(order)
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
