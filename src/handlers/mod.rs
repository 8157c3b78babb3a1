use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;

use crate::clients::{CartClient, InventoryClient, PaymentGateway};
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    AddressService, OrderService, PaymentConfirmationService, ShipmentStatusService,
};
use crate::AppState;

pub mod addresses;
pub mod orders;
pub mod payments;
pub mod shipments;

/// Aggregated service instances shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub addresses: Arc<AddressService>,
    pub shipment_status: Arc<ShipmentStatusService>,
    pub payments: Arc<PaymentConfirmationService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
        cart: Arc<dyn CartClient>,
        gateway: Arc<dyn PaymentGateway>,
        inventory: Arc<dyn InventoryClient>,
    ) -> Self {
        let addresses = Arc::new(AddressService::new(db.clone()));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            config.clone(),
            addresses.clone(),
            cart,
            gateway,
            inventory,
            event_sender.clone(),
        ));
        let shipment_status = Arc::new(ShipmentStatusService::new(db.clone(), event_sender.clone()));
        let payments = Arc::new(PaymentConfirmationService::new(
            db,
            event_sender,
            config.payment_gateway_secret.clone(),
        ));

        Self {
            orders,
            addresses,
            shipment_status,
            payments,
        }
    }
}

/// Routes exposed under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::place_order).get(orders::order_history))
        .route("/orders/admin/all", get(orders::all_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(shipments::update_status))
        .route("/orders/:id/history", get(shipments::status_history))
        .route("/cart/totals", get(orders::cart_totals))
        .route("/payments/mark-paid/:gateway_order_id", put(payments::mark_paid))
        .route("/payments/verify", post(payments::verify_signature))
        .route("/addresses", post(addresses::save_address))
        .route("/addresses/me", get(addresses::my_address))
}
