use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Identity;
use crate::clients::{CartClient, CartLine, InitiatePayment, InventoryClient, PaymentGateway, StockDecrement};
use crate::config::AppConfig;
use crate::entities::order::{
    self, Entity as OrderEntity, Model as OrderModel, PaymentStatus, ShipmentStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::addresses::AddressService;
use crate::services::pricing::{self, CartTotals};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub address_id: Uuid,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub username: String,
    pub subtotal: Decimal,
    pub total_amount: Decimal,
    pub total_quantity: i32,
    pub payment_method: String,
    pub status: ShipmentStatus,
    pub payment_status: PaymentStatus,
    pub order_date: DateTime<Utc>,
    pub address_id: Uuid,
    pub gateway_order_id: Option<String>,
    pub needs_reconciliation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl From<OrderModel> for OrderResponse {
    fn from(order: OrderModel) -> Self {
        Self {
            id: order.id,
            username: order.username,
            subtotal: order.subtotal,
            total_amount: order.total_amount,
            total_quantity: order.total_quantity,
            payment_method: order.payment_method,
            status: order.status,
            payment_status: order.payment_status,
            order_date: order.order_date,
            address_id: order.address_id,
            gateway_order_id: order.gateway_order_id,
            needs_reconciliation: order.needs_reconciliation,
            created_at: order.created_at,
            updated_at: order.updated_at,
            version: order.version,
        }
    }
}

/// Owns the `Order` entity and runs the placement workflow: a fixed-order
/// saga across the cart, address, payment, and inventory collaborators.
///
/// Steps after the order row is persisted are remote side effects with no
/// shared transaction. A failure there stops the workflow, flags the order
/// for reconciliation, and surfaces the error; nothing is rolled back. The
/// payment receipt is derived from the order id so steps are retriable
/// under a stable idempotency key.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
    addresses: Arc<AddressService>,
    cart: Arc<dyn CartClient>,
    gateway: Arc<dyn PaymentGateway>,
    inventory: Arc<dyn InventoryClient>,
    event_sender: Arc<EventSender>,
    /// One async mutex per username; placement holds it end-to-end so two
    /// concurrent placements cannot double-book the same cart snapshot.
    placement_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        addresses: Arc<AddressService>,
        cart: Arc<dyn CartClient>,
        gateway: Arc<dyn PaymentGateway>,
        inventory: Arc<dyn InventoryClient>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            config,
            addresses,
            cart,
            gateway,
            inventory,
            event_sender,
            placement_locks: Arc::new(DashMap::new()),
        }
    }

    /// Places an order for the acting user.
    ///
    /// Workflow: fetch cart -> resolve address -> compute totals -> persist
    /// order (PLACED / PENDING) -> initiate payment -> decrement inventory
    /// -> clear cart -> return the persisted order.
    #[instrument(skip(self, identity, request), fields(username = %identity.username, address_id = %request.address_id))]
    pub async fn place_order(
        &self,
        identity: &Identity,
        request: PlaceOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let lock = self.user_lock(&identity.username);
        let _placement = lock.lock().await;

        let lines = self.cart.get_items(identity).await?;
        if lines.is_empty() {
            return Err(ServiceError::CartEmpty(identity.username.clone()));
        }

        let address = self.addresses.resolve(identity, request.address_id).await?;

        let totals = pricing::cart_totals(&lines);
        if totals.subtotal <= Decimal::ZERO {
            return Err(ServiceError::ZeroTotal);
        }
        // Taxes, discounts and delivery would be folded in here; for now
        // the charged amount equals the subtotal.
        let total_amount = totals.subtotal;

        let order = self
            .persist_order(identity, &request, address.id, &totals, total_amount)
            .await?;
        info!(order_id = %order.id, total_amount = %order.total_amount, "order persisted");

        if let Err(err) = self.run_post_placement_steps(identity, &order, &lines).await {
            self.flag_for_reconciliation(order.id).await;
            return Err(err);
        }

        self.event_sender.send_or_log(Event::OrderPlaced(order.id)).await;

        let order = self.load_order(order.id).await?;
        Ok(OrderResponse::from(order))
    }

    /// Totals the acting user's current cart without placing an order. Uses
    /// the same computation as placement so the preview always matches the
    /// amount a placement call would charge.
    #[instrument(skip(self, identity), fields(username = %identity.username))]
    pub async fn current_cart_totals(&self, identity: &Identity) -> Result<CartTotals, ServiceError> {
        let lines = self.cart.get_items(identity).await?;
        Ok(pricing::cart_totals(&lines))
    }

    /// The acting user's orders, newest first.
    #[instrument(skip(self, identity), fields(username = %identity.username))]
    pub async fn orders_for_user(&self, identity: &Identity) -> Result<Vec<OrderModel>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::Username.eq(&identity.username))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// A single order, owner-scoped.
    #[instrument(skip(self, identity), fields(username = %identity.username, order_id = %id))]
    pub async fn get_order(&self, identity: &Identity, id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(id)
            .filter(order::Column::Username.eq(&identity.username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.to_string()))
    }

    /// Every order in the system, newest first. Callers gate this on the
    /// admin role.
    #[instrument(skip(self))]
    pub async fn all_orders(&self) -> Result<Vec<OrderModel>, ServiceError> {
        OrderEntity::find()
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    fn user_lock(&self, username: &str) -> Arc<Mutex<()>> {
        // Entries are retained per user for the process lifetime.
        self.placement_locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    async fn persist_order(
        &self,
        identity: &Identity,
        request: &PlaceOrderRequest,
        address_id: Uuid,
        totals: &CartTotals,
        total_amount: Decimal,
    ) -> Result<OrderModel, ServiceError> {
        let now = Utc::now();
        let new_order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(identity.username.clone()),
            subtotal: Set(totals.subtotal),
            total_amount: Set(total_amount),
            total_quantity: Set(totals.total_quantity),
            payment_method: Set(request.payment_method.clone()),
            status: Set(ShipmentStatus::Placed),
            payment_status: Set(PaymentStatus::Pending),
            order_date: Set(now),
            address_id: Set(address_id),
            gateway_order_id: Set(None),
            needs_reconciliation: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
        };

        new_order.insert(&*self.db).await.map_err(|e| {
            error!(username = %identity.username, error = %e, "failed to persist order");
            ServiceError::DatabaseError(e)
        })
    }

    /// Steps 5-7 of the workflow: payment initiation, inventory decrement,
    /// cart clear. Each is a blocking remote call that can fail on its own
    /// after the order row already exists.
    async fn run_post_placement_steps(
        &self,
        identity: &Identity,
        order: &OrderModel,
        lines: &[CartLine],
    ) -> Result<(), ServiceError> {
        let gateway_order = self
            .gateway
            .initiate(&InitiatePayment {
                amount_minor: to_minor_units(order.total_amount)?,
                currency: self.config.currency.clone(),
                receipt: payment_receipt(order.id),
            })
            .await?;

        self.record_gateway_order(order.id, &gateway_order.order_id)
            .await?;
        self.event_sender
            .send_or_log(Event::PaymentInitiated {
                order_id: order.id,
                gateway_order_id: gateway_order.order_id,
            })
            .await;

        let updates: Vec<StockDecrement> = lines
            .iter()
            .map(|line| StockDecrement {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        self.inventory.decrement_stock(&updates).await?;

        self.cart.clear(identity).await?;
        self.event_sender
            .send_or_log(Event::CartCleared {
                username: identity.username.clone(),
            })
            .await;

        Ok(())
    }

    async fn record_gateway_order(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
    ) -> Result<(), ServiceError> {
        let order = self.load_order(order_id).await?;
        let mut active: order::ActiveModel = order.into();
        let current_version = *active.version.as_ref();
        active.gateway_order_id = Set(Some(gateway_order_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(current_version + 1);
        active.update(&*self.db).await?;
        Ok(())
    }

    /// Best-effort marker update; the original workflow error is what the
    /// caller sees, so a failure here is only logged.
    async fn flag_for_reconciliation(&self, order_id: Uuid) {
        let result = OrderEntity::update_many()
            .set(order::ActiveModel {
                needs_reconciliation: Set(true),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .exec(&*self.db)
            .await;

        match result {
            Ok(_) => {
                warn!(order_id = %order_id, "order flagged for reconciliation");
                self.event_sender
                    .send_or_log(Event::OrderNeedsReconciliation(order_id))
                    .await;
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "failed to flag order for reconciliation");
            }
        }
    }

    async fn load_order(&self, id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.to_string()))
    }
}

/// Receipt identifier sent to the gateway; stable per order so retried
/// initiations are idempotent.
pub fn payment_receipt(order_id: Uuid) -> String {
    format!("order_rcpt_{order_id}")
}

/// Converts a decimal amount to minor currency units as the gateway
/// expects, truncating any sub-minor fraction.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| ServiceError::InternalError(format!("amount {amount} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_truncate_sub_minor_fractions() {
        assert_eq!(to_minor_units(dec!(25)).ok(), Some(2500));
        assert_eq!(to_minor_units(dec!(19.99)).ok(), Some(1999));
        assert_eq!(to_minor_units(dec!(0.019)).ok(), Some(1));
    }

    #[test]
    fn receipt_is_stable_per_order() {
        let id = Uuid::new_v4();
        assert_eq!(payment_receipt(id), payment_receipt(id));
        assert!(payment_receipt(id).starts_with("order_rcpt_"));
    }
}
