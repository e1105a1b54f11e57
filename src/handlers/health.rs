use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "db": "OK",
                "backend": state.db.backend().as_str(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "environment": state.config.app_env,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, code = ?e.code, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "DEGRADED",
                    "db": "ERROR",
                    "message": e.message,
                    "code": e.code,
                })),
            )
        }
    }
}
