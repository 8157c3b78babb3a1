use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{Identity, TokenIssuer, ROLE_USER};
use crate::errors::ServiceError;

/// One line of a user's remote cart. The cart collaborator owns the data;
/// this core only ever reads a snapshot of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Contract with the cart collaborator.
#[async_trait]
pub trait CartClient: Send + Sync {
    /// Fetches the current cart lines for the acting user.
    async fn get_items(&self, identity: &Identity) -> Result<Vec<CartLine>, ServiceError>;

    /// Purges the acting user's remote cart.
    async fn clear(&self, identity: &Identity) -> Result<(), ServiceError>;
}

/// HTTP implementation talking to the cart service's internal endpoints.
/// A short-lived service token is minted per call for the acting user.
pub struct HttpCartClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenIssuer>,
}

impl HttpCartClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl CartClient for HttpCartClient {
    #[instrument(skip(self, identity), fields(username = %identity.username))]
    async fn get_items(&self, identity: &Identity) -> Result<Vec<CartLine>, ServiceError> {
        let token = self.tokens.issue(&identity.username, &[ROLE_USER])?;
        let response = self
            .http
            .get(format!("{}/cart/internal/items", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("cart service: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "cart service returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("cart service payload: {e}")))
    }

    #[instrument(skip(self, identity), fields(username = %identity.username))]
    async fn clear(&self, identity: &Identity) -> Result<(), ServiceError> {
        let token = self.tokens.issue(&identity.username, &[ROLE_USER])?;
        let response = self
            .http
            .delete(format!("{}/cart/internal/clear", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("cart service: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "cart service returned {} on clear",
                response.status()
            )));
        }

        Ok(())
    }
}
