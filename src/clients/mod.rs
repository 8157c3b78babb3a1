//! Collaborator contracts consumed by the order core.
//!
//! Each collaborator is a narrow async trait with a reqwest-backed HTTP
//! implementation; services depend on the traits so tests can substitute
//! in-memory doubles.

pub mod cart;
pub mod inventory;
pub mod payment;

pub use cart::{CartClient, CartLine, HttpCartClient};
pub use inventory::{HttpInventoryClient, InventoryClient, StockDecrement};
pub use payment::{GatewayOrder, HttpPaymentGateway, InitiatePayment, PaymentGateway};

use std::time::Duration;

use crate::errors::ServiceError;

/// Builds the shared outbound HTTP client. The timeout applies per request;
/// a timed-out collaborator call is treated as a hard failure of that step.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ServiceError::InternalError(format!("failed to build http client: {e}")))
}
