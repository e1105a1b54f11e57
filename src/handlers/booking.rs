use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::middleware::{AdminUser, JsonBody};
use crate::models::availability::DEFAULT_DURATION_MINUTES;
use crate::models::validation::{is_iso_date, valid_duration};
use crate::models::{Booking, BookingStatus, NewBooking, StatusUpdate};
use crate::pagination::{PageRequest, Pagination};
use crate::services::scheduling;
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Booking not found".to_string())
}

// GET /api/booking/availability/:date
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub location_id: Option<String>,
    pub duration: Option<String>,
}

pub async fn availability(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .ok()
        .filter(|_| is_iso_date(&date))
        .ok_or_else(|| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;

    let location_id = match params.location_id.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::Validation("location_id must be an integer".to_string()))?,
        ),
    };

    let duration = match params.duration.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_DURATION_MINUTES,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|d| valid_duration(*d))
            .ok_or_else(|| {
                AppError::Validation("duration must be between 15 and 300 minutes".to_string())
            })?,
    };

    let schedule = scheduling::availability(state.db.as_ref(), day, location_id, duration).await?;
    Ok(Json(json!({
        "date": date,
        "location_id": location_id.map(Value::from).unwrap_or_else(|| Value::from("all")),
        "duration": duration,
        "available_slots": schedule.available_slots,
        "booked_slots": schedule.booked_slots,
    })))
}

// POST /api/booking
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<NewBooking>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = scheduling::create_booking(state.db.as_ref(), &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking created successfully",
            "next_steps": {
                "payment_required": false,
                "confirmation_email": "will_be_sent",
                "booking_id": booking.id,
            },
            "booking": booking,
        })),
    ))
}

// GET /api/booking/admin
#[derive(Debug, Deserialize)]
pub struct AdminBookingsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub location_id: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<AdminBookingsQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref())
        .map_err(AppError::Validation)?;

    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?,
        ),
        None => None,
    };
    let date = match params.date.filter(|d| !d.is_empty()) {
        Some(d) if is_iso_date(&d) => Some(d),
        Some(_) => return Err(AppError::Validation("date must be YYYY-MM-DD".to_string())),
        None => None,
    };
    let location_id = match params.location_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::Validation("location_id must be an integer".to_string()))?,
        ),
        None => None,
    };

    let filter = BookingFilter {
        status,
        date,
        location_id,
    };
    let (bookings, total) = queries::list_bookings(state.db.as_ref(), &filter, &page).await?;
    Ok(Json(json!({
        "bookings": bookings,
        "pagination": Pagination::new(page, total),
    })))
}

// GET /api/booking/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    let booking = queries::get_booking(state.db.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(booking))
}

// PATCH|PUT /api/booking/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<StatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let (status, payment_status) = body.parse().map_err(AppError::Validation)?;

    if let Some(next) = status {
        let current = queries::get_booking(state.db.as_ref(), id)
            .await?
            .ok_or_else(not_found)?;
        if !current.status.can_become(next) {
            return Err(AppError::Conflict(format!(
                "Cannot change a {} booking to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }
    }

    // Reinstating a cancelled booking can collide with a newer one in the same slot
    let booking = queries::update_booking_status(state.db.as_ref(), id, status, payment_status)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::Conflict("Time slot is already booked".to_string())
            } else {
                e.into()
            }
        })?
        .ok_or_else(not_found)?;

    tracing::info!(booking_id = id, status = booking.status.as_str(), "booking status updated");
    Ok(Json(json!({
        "message": "Booking updated successfully",
        "booking": booking,
    })))
}

// DELETE /api/booking/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !queries::delete_booking(state.db.as_ref(), id).await? {
        return Err(not_found());
    }
    tracing::info!(booking_id = id, "booking deleted");
    Ok(Json(json!({ "message": "Booking deleted successfully" })))
}
