use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::errors::ServiceError;
use crate::services::orders::OrderResponse;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySignatureRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySignatureResponse {
    pub valid: bool,
}

/// PUT /api/v1/payments/mark-paid/{gateway_order_id}
pub async fn mark_paid(
    State(state): State<AppState>,
    _identity: Identity,
    Path(gateway_order_id): Path<String>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.services.payments.mark_paid(&gateway_order_id).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// POST /api/v1/payments/verify
pub async fn verify_signature(
    State(state): State<AppState>,
    _identity: Identity,
    Json(payload): Json<VerifySignatureRequest>,
) -> Result<Json<VerifySignatureResponse>, ServiceError> {
    let valid = state.services.payments.verify_signature(
        &payload.gateway_order_id,
        &payload.payment_id,
        &payload.signature,
    )?;
    Ok(Json(VerifySignatureResponse { valid }))
}
