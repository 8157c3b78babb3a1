mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{admin, user, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::clients::CartLine;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response is json")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}

#[tokio::test]
async fn health_endpoint_needs_no_auth() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "up");
}

#[tokio::test]
async fn api_routes_reject_missing_tokens() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(request(Method::GET, "/api/v1/orders", None, None))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_totals_round_trip_over_http() {
    let app = TestApp::new().await;
    app.cart.set_items(vec![CartLine {
        product_id: Uuid::new_v4(),
        quantity: 2,
        unit_price: dec!(10),
    }]);

    let token = app.token_for(&user());
    let response = app
        .router()
        .oneshot(request(Method::GET, "/api/v1/cart/totals", Some(&token), None))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_quantity"], 2);
    assert_eq!(body["subtotal"], json!("20"));
}

#[tokio::test]
async fn shipment_updates_require_the_admin_role() {
    let app = TestApp::new().await;
    let token = app.token_for(&user());
    let response = app
        .router()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", Uuid::new_v4()),
            Some(&token),
            Some(json!({"status": "PROCESSING"})),
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_placement_flow_over_http() {
    let app = TestApp::new().await;
    let identity = user();
    let address_id = app.seed_address(&identity).await;
    app.cart.set_items(vec![CartLine {
        product_id: Uuid::new_v4(),
        quantity: 3,
        unit_price: dec!(7),
    }]);

    let token = app.token_for(&identity);
    let response = app
        .router()
        .oneshot(request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({"address_id": address_id, "payment_method": "upi"})),
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["status"], "PLACED");
    assert_eq!(body["payment_status"], "PENDING");
    assert_eq!(body["total_quantity"], 3);

    // The bad-signature path reports a boolean outcome, not an error.
    let admin_token = app.token_for(&admin());
    let response = app
        .router()
        .oneshot(request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&admin_token),
            Some(json!({
                "gateway_order_id": body["gateway_order_id"],
                "payment_id": "pay_1",
                "signature": "not_a_real_signature"
            })),
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let verify_body = body_json(response).await;
    assert_eq!(verify_body["valid"], false);
}
