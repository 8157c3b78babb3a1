use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::auth::Identity;
use crate::entities::address::Model as AddressModel;
use crate::errors::ServiceError;
use crate::services::addresses::CreateAddressRequest;
use crate::AppState;

/// POST /api/v1/addresses
pub async fn save_address(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let address = state
        .services
        .addresses
        .save_address(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// GET /api/v1/addresses/me
pub async fn my_address(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<AddressModel>, ServiceError> {
    let address = state.services.addresses.address_for_user(&identity).await?;
    Ok(Json(address))
}
