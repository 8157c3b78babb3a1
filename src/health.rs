use axum::{response::Json, http::StatusCode};
use serde_json::{json, Value};

/// GET /health — liveness probe.
pub async fn simple_health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "up",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
