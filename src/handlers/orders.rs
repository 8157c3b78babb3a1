use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::auth::{Identity, ROLE_ADMIN};
use crate::errors::ServiceError;
use crate::services::orders::{OrderResponse, PlaceOrderRequest};
use crate::services::pricing::CartTotals;
use crate::AppState;

/// POST /api/v1/orders
pub async fn place_order(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.place_order(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/v1/orders
pub async fn order_history(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let orders = state.services.orders.orders_for_user(&identity).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.services.orders.get_order(&identity, id).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// GET /api/v1/orders/admin/all
pub async fn all_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    identity.require_role(ROLE_ADMIN)?;
    let orders = state.services.orders.all_orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /api/v1/cart/totals
pub async fn cart_totals(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CartTotals>, ServiceError> {
    let totals = state.services.orders.current_cart_totals(&identity).await?;
    Ok(Json(totals))
}
