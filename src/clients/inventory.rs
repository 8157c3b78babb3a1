use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;

/// One stock decrement, keyed by product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Contract with the product/inventory collaborator.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Decrements stock for each purchased line in one batch.
    async fn decrement_stock(&self, updates: &[StockDecrement]) -> Result<(), ServiceError>;
}

/// HTTP implementation talking to the product service.
pub struct HttpInventoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[instrument(skip(self, updates), fields(update_count = updates.len()))]
    async fn decrement_stock(&self, updates: &[StockDecrement]) -> Result<(), ServiceError> {
        let response = self
            .http
            .put(format!("{}/products/update-stock", self.base_url))
            .json(updates)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("inventory service: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            reqwest::StatusCode::CONFLICT => Err(ServiceError::InsufficientStock(body)),
            reqwest::StatusCode::NOT_FOUND => Err(ServiceError::NotFound(body)),
            _ => Err(ServiceError::ExternalServiceError(format!(
                "inventory service returned {status}: {body}"
            ))),
        }
    }
}
