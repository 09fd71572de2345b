use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Alejandria API" }))
}

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
