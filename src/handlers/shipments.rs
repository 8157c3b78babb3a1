use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Identity, ROLE_ADMIN};
use crate::entities::order_status_history::Model as HistoryModel;
use crate::errors::ServiceError;
use crate::services::orders::OrderResponse;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateShipmentStatusRequest {
    pub status: String,
}

/// PUT /api/v1/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShipmentStatusRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    identity.require_role(ROLE_ADMIN)?;
    let order = state
        .services
        .shipment_status
        .update_status(id, &payload.status, &identity)
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// GET /api/v1/orders/{id}/history
pub async fn status_history(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryModel>>, ServiceError> {
    // Owners see their own trail; admins see any.
    if !identity.has_role(ROLE_ADMIN) {
        state.services.orders.get_order(&identity, id).await?;
    }
    let history = state.services.shipment_status.status_history(id).await?;
    Ok(Json(history))
}
