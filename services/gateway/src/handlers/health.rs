use axum::response::Json;
use serde_json::json;

/// Liveness probe. The body is a fixed contract; nothing behind it is
/// checked here (see `/api/status` for configuration state).
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "message": "project running" }))
}
