use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Identity;
use crate::entities::address::{self, Entity as AddressEntity, Model as AddressModel};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 6, max = 20, message = "Phone number must be 6-20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 3, max = 10, message = "Postal code must be 3-10 characters"))]
    pub postal_code: String,
}

/// Loads and stores shipping addresses, always scoped to the owning user.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stores a new address for the acting user.
    #[instrument(skip(self, identity, request), fields(username = %identity.username))]
    pub async fn save_address(
        &self,
        identity: &Identity,
        request: CreateAddressRequest,
    ) -> Result<AddressModel, ServiceError> {
        request.validate()?;

        let address = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(identity.username.clone()),
            name: Set(request.name),
            phone: Set(request.phone),
            street: Set(request.street),
            city: Set(request.city),
            state: Set(request.state),
            postal_code: Set(request.postal_code),
            created_at: Set(Utc::now()),
        };

        let saved = address.insert(&*self.db).await?;
        info!(address_id = %saved.id, "address saved");
        Ok(saved)
    }

    /// Resolves an address by id, owned by the acting user. A foreign or
    /// missing id is indistinguishable to the caller.
    #[instrument(skip(self, identity), fields(username = %identity.username, address_id = %id))]
    pub async fn resolve(&self, identity: &Identity, id: Uuid) -> Result<AddressModel, ServiceError> {
        AddressEntity::find_by_id(id)
            .filter(address::Column::Username.eq(&identity.username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AddressNotFound(id.to_string()))
    }

    /// Most recently saved address for the acting user.
    #[instrument(skip(self, identity), fields(username = %identity.username))]
    pub async fn address_for_user(&self, identity: &Identity) -> Result<AddressModel, ServiceError> {
        AddressEntity::find()
            .filter(address::Column::Username.eq(&identity.username))
            .order_by_desc(address::Column::CreatedAt)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::AddressNotFound(format!("no address for user {}", identity.username))
            })
    }
}
