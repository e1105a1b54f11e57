use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::queries;
use crate::errors::AppError;
use crate::middleware::{AdminUser, JsonBody};
use crate::models::{NewService, Service, ServicePatch};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Service not found".to_string())
}

fn duplicate_name(e: crate::db::StorageError) -> AppError {
    if e.is_unique_violation() {
        AppError::Conflict("A service with this name already exists".to_string())
    } else {
        e.into()
    }
}

// GET /api/services
#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    pub category: Option<String>,
    pub active_only: Option<String>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServicesQuery>,
) -> Result<Json<Value>, AppError> {
    let category = params.category.as_deref().filter(|c| !c.is_empty());
    let active_only = params.active_only.as_deref() == Some("true");
    let services = queries::list_services(state.db.as_ref(), category, active_only).await?;
    Ok(Json(json!({ "services": services })))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = queries::get_service(state.db.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(json!({ "service": service })))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<NewService>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = queries::create_service(state.db.as_ref(), &body)
        .await
        .map_err(duplicate_name)?;
    tracing::info!(service_id = service.id, key = %service.service_key, "service created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Service created successfully",
            "service": service,
        })),
    ))
}

// PUT /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ServicePatch>,
) -> Result<Json<Value>, AppError> {
    let patch = queries::service_patch(&body);
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let service: Service = queries::apply_patch(state.db.as_ref(), patch, id)
        .await
        .map_err(duplicate_name)?
        .ok_or_else(not_found)?;
    Ok(Json(json!({
        "message": "Service updated successfully",
        "service": service,
    })))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.as_ref();
    if queries::service_booking_count(db, id).await? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete service that has associated bookings. Deactivate it instead."
                .to_string(),
        ));
    }
    if !queries::delete_service(db, id).await? {
        return Err(not_found());
    }
    tracing::info!(service_id = id, "service deleted");
    Ok(Json(json!({
        "message": "Service deleted successfully",
        "deleted": { "id": id },
    })))
}

// GET /api/services/meta/categories
pub async fn categories(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let categories = queries::service_categories(state.db.as_ref()).await?;
    Ok(Json(json!({ "categories": categories })))
}
