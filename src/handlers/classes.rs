use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::queries::{self, EnrollmentFilter};
use crate::db::storage::{StorageError, StorageErrorKind};
use crate::errors::AppError;
use crate::middleware::{AdminUser, JsonBody};
use crate::models::{Class, ClassPatch, NewClass, NewEnrollment, PaymentStatus, StatusUpdate};
use crate::pagination::{PageRequest, Pagination};
use crate::services::enrollment;
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Class not found".to_string())
}

fn constraint_error(e: StorageError) -> AppError {
    match e.kind {
        StorageErrorKind::UniqueViolation => {
            AppError::Conflict("A class with this course key already exists".to_string())
        }
        StorageErrorKind::CheckViolation => AppError::Validation(
            "max_participants cannot be lower than current enrollment".to_string(),
        ),
        StorageErrorKind::ForeignKeyViolation => {
            AppError::Validation("location_id does not reference a location".to_string())
        }
        _ => e.into(),
    }
}

// GET /api/classes
#[derive(Debug, Deserialize)]
pub struct ClassesQuery {
    pub category: Option<String>,
    pub active_only: Option<String>,
}

pub async fn list_classes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClassesQuery>,
) -> Result<Json<Value>, AppError> {
    let category = params.category.as_deref().filter(|c| !c.is_empty());
    let active_only = params.active_only.as_deref() != Some("false");
    let classes = queries::list_classes(state.db.as_ref(), category, active_only).await?;
    Ok(Json(json!({ "classes": classes })))
}

// GET /api/classes/:id
pub async fn get_class(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let class = queries::get_class(state.db.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(json!({ "class": class })))
}

// POST /api/classes
pub async fn create_class(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<NewClass>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let class = queries::create_class(state.db.as_ref(), &body)
        .await
        .map_err(constraint_error)?;
    tracing::info!(class_id = class.id, "class created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Class created successfully",
            "class": class,
        })),
    ))
}

// PUT /api/classes/:id
pub async fn update_class(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<ClassPatch>,
) -> Result<Json<Value>, AppError> {
    let patch = queries::class_patch(&body);
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let class: Class = queries::apply_patch(state.db.as_ref(), patch, id)
        .await
        .map_err(constraint_error)?
        .ok_or_else(not_found)?;
    Ok(Json(json!({
        "message": "Class updated successfully",
        "class": class,
    })))
}

// DELETE /api/classes/:id
pub async fn delete_class(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.as_ref();
    if queries::class_enrollment_count(db, id).await? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete class with existing enrollments. Deactivate it instead.".to_string(),
        ));
    }
    if !queries::delete_class(db, id).await? {
        return Err(not_found());
    }
    tracing::info!(class_id = id, "class deleted");
    Ok(Json(json!({ "message": "Class deleted successfully" })))
}

// POST /api/classes/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<NewEnrollment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registration = enrollment::enroll(state.db.as_ref(), &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration created successfully",
            "registration": registration,
            "next_steps": {
                "payment_required": registration.payment_status != PaymentStatus::Paid,
                "confirmation_email": "will_be_sent",
                "registration_id": registration.id,
            },
        })),
    ))
}

// GET /api/classes/registrations
#[derive(Debug, Deserialize)]
pub struct RegistrationsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Payment status.
    pub status: Option<String>,
    /// Class title.
    pub course_type: Option<String>,
}

pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<RegistrationsQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref())
        .map_err(AppError::Validation)?;
    let payment_status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            PaymentStatus::parse(s)
                .ok_or_else(|| AppError::Validation("Invalid payment status".to_string()))?,
        ),
        None => None,
    };
    let filter = EnrollmentFilter {
        payment_status,
        class_title: params.course_type.filter(|t| !t.is_empty()),
    };

    let (registrations, total) =
        queries::list_enrollments(state.db.as_ref(), &filter, &page).await?;
    Ok(Json(json!({
        "registrations": registrations,
        "pagination": Pagination::new(page, total),
    })))
}

// PATCH /api/classes/registrations/:id/status
pub async fn update_registration_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<StatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let (status, payment_status) = body.parse().map_err(AppError::Validation)?;
    let registration =
        enrollment::update_status(state.db.as_ref(), id, status, payment_status).await?;
    Ok(Json(json!({
        "message": "Registration updated successfully",
        "registration": registration,
    })))
}
