use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::queries;
use crate::errors::AppError;
use crate::middleware::{AdminUser, JsonBody};
use crate::models::{Location, LocationPatch, NewLocation};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Location not found".to_string())
}

// GET /api/locations
#[derive(Debug, Deserialize)]
pub struct LocationsQuery {
    pub active_only: Option<String>,
}

pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationsQuery>,
) -> Result<Json<Vec<Location>>, AppError> {
    let active_only = params.active_only.as_deref() == Some("true");
    let locations = queries::list_locations(state.db.as_ref(), active_only).await?;
    Ok(Json(locations))
}

// GET /api/locations/:id
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Location>, AppError> {
    let location = queries::get_location(state.db.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(location))
}

// POST /api/locations
pub async fn create_location(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<NewLocation>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let location = queries::create_location(state.db.as_ref(), &body).await?;
    tracing::info!(location_id = location.id, "location created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Location created successfully",
            "location": location,
        })),
    ))
}

// PUT /api/locations/:id
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<LocationPatch>,
) -> Result<Json<Value>, AppError> {
    let patch = queries::location_patch(&body);
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let location: Location = queries::apply_patch(state.db.as_ref(), patch, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(json!({
        "message": "Location updated successfully",
        "location": location,
    })))
}

// DELETE /api/locations/:id
pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.as_ref();
    let (bookings, classes) = queries::location_references(db, id).await?;
    if bookings > 0 {
        return Err(AppError::Conflict(
            "Cannot delete location with existing bookings".to_string(),
        ));
    }
    if classes > 0 {
        return Err(AppError::Conflict(
            "Cannot delete location with scheduled classes".to_string(),
        ));
    }

    let location = queries::delete_location(db, id).await?.ok_or_else(not_found)?;
    tracing::info!(location_id = id, "location deleted");
    Ok(Json(json!({
        "message": "Location deleted successfully",
        "deleted_location": location,
    })))
}

// PATCH /api/locations/:id/toggle-active
pub async fn toggle_active(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let location = queries::toggle_location(state.db.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    let verb = if location.is_active { "activated" } else { "deactivated" };
    Ok(Json(json!({
        "message": format!("Location {verb} successfully"),
        "location": location,
    })))
}
