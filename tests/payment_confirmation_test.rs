mod common;

use common::{user, TestApp};
use rust_decimal_macros::dec;
use uuid::Uuid;

use storefront_api::clients::CartLine;
use storefront_api::entities::order::{PaymentStatus, ShipmentStatus};
use storefront_api::errors::ServiceError;
use storefront_api::services::orders::{OrderResponse, PlaceOrderRequest};
use storefront_api::services::payments::compute_signature;

async fn placed_order(app: &TestApp) -> OrderResponse {
    let identity = user();
    let address_id = app.seed_address(&identity).await;
    app.cart.set_items(vec![CartLine {
        product_id: Uuid::new_v4(),
        quantity: 1,
        unit_price: dec!(42),
    }]);
    app.services()
        .orders
        .place_order(
            &identity,
            PlaceOrderRequest {
                address_id,
                payment_method: "card".to_string(),
            },
        )
        .await
        .expect("place order")
}

#[tokio::test]
async fn mark_paid_confirms_exactly_once() {
    let app = TestApp::new().await;
    let order = placed_order(&app).await;
    let gateway_order_id = order.gateway_order_id.expect("correlation id");

    let paid = app
        .services()
        .payments
        .mark_paid(&gateway_order_id)
        .await
        .expect("mark paid");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    // Confirmation never touches the shipment ladder.
    assert_eq!(paid.status, ShipmentStatus::Placed);
    assert!(paid.version > order.version);

    // Idempotency is enforced by rejection; retries must treat this as
    // non-fatal.
    let err = app
        .services()
        .payments
        .mark_paid(&gateway_order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyPaid(_)));

    let reloaded = app
        .services()
        .orders
        .get_order(&user(), order.id)
        .await
        .expect("reload order");
    assert_eq!(reloaded.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn unknown_correlation_ids_are_reported() {
    let app = TestApp::new().await;

    let err = app
        .services()
        .payments
        .mark_paid("gw_order_missing")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OrderNotFound(_)));
}

#[tokio::test]
async fn callback_signatures_verify_against_the_shared_secret() {
    let app = TestApp::new().await;

    // The harness configures "test_gateway_secret" as the shared secret.
    let signature =
        compute_signature("test_gateway_secret", "gw_order_7", "pay_123").expect("sign");

    let valid = app
        .services()
        .payments
        .verify_signature("gw_order_7", "pay_123", &signature)
        .expect("verify");
    assert!(valid);

    let mut tampered = signature.clone();
    let replacement = if tampered.starts_with('a') { "b" } else { "a" };
    tampered.replace_range(0..1, replacement);
    let valid = app
        .services()
        .payments
        .verify_signature("gw_order_7", "pay_123", &tampered)
        .expect("verify tampered");
    assert!(!valid);
}
