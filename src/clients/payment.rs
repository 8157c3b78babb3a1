use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::ServiceError;

/// Request to create a payable order at the gateway. The amount is in
/// minor currency units; the receipt doubles as the idempotency key for
/// safe retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePayment {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
}

/// The gateway's view of the created order. `order_id` is the correlation
/// id persisted on the local order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub status: String,
    pub receipt: String,
}

/// Contract with the payment gateway collaborator. Only the order-creation
/// request/response matters here; gateway internals stay external.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: &InitiatePayment) -> Result<GatewayOrder, ServiceError>;
}

/// HTTP implementation talking to the payment service.
pub struct HttpPaymentGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self), fields(receipt = %request.receipt, amount_minor = request.amount_minor))]
    async fn initiate(&self, request: &InitiatePayment) -> Result<GatewayOrder, ServiceError> {
        let response = self
            .http
            .post(format!("{}/payment/initiate", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentInitiationFailure(format!("payment service: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::PaymentInitiationFailure(format!(
                "payment service returned {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| {
            ServiceError::PaymentInitiationFailure(format!("payment service payload: {e}"))
        })
    }
}
