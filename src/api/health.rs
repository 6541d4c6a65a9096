use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the database answers and the cursor can be read.
pub async fn ready(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.repo.get_cursor().await {
        Ok(cursor) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "blockHeight": cursor.map(|c| c.block_height),
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable"})),
            )
        }
    }
}
