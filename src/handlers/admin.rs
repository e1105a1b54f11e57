use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InitKey {
    pub key: Option<String>,
}

// ANY /api/admin/init
// The key may come from the query string or a JSON body.
pub async fn init(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InitKey>,
    body: Option<Json<InitKey>>,
) -> Result<Json<Value>, AppError> {
    let supplied = params.key.or_else(|| body.and_then(|Json(b)| b.key));
    if let Some(required) = state.config.admin_init_key.as_deref() {
        if supplied.as_deref() != Some(required) {
            return Err(AppError::Forbidden("Forbidden".to_string()));
        }
    }

    db::init(state.db.as_ref(), &state.config).await?;
    tracing::info!("schema and seed data re-applied");
    Ok(Json(json!({ "ok": true })))
}
