use super::builder::{Patch, QueryBuilder};
use super::storage::{Statement, Storage, StorageError};
use crate::models::columns::json_text;
use crate::models::{
    Booking, BookingStatus, BookingSummary, CategoryCount, Class, ClassPatch, Enrollment,
    EnrollmentSummary, Location, LocationPatch, NewBooking, NewClass, NewEnrollment, NewLocation,
    NewService, PaymentStatus, Service, ServicePatch, User,
};
use crate::pagination::PageRequest;

type Result<T> = std::result::Result<T, StorageError>;

async fn fetch_all<T: serde::de::DeserializeOwned>(db: &dyn Storage, stmt: &Statement) -> Result<Vec<T>> {
    db.execute(stmt).await?.decode_all(db.backend())
}

async fn fetch_one<T: serde::de::DeserializeOwned>(db: &dyn Storage, stmt: &Statement) -> Result<Option<T>> {
    db.execute(stmt).await?.decode_first(db.backend())
}

async fn count(db: &dyn Storage, stmt: &Statement) -> Result<i64> {
    Ok(db.execute(stmt).await?.scalar_i64("total").unwrap_or(0))
}

/// Like `fetch_one`, but a write that returned no row is an engine fault.
async fn fetch_written<T: serde::de::DeserializeOwned>(db: &dyn Storage, stmt: &Statement) -> Result<T> {
    fetch_one(db, stmt)
        .await?
        .ok_or_else(|| StorageError::other(db.backend(), "write returned no row"))
}

fn encoded<T: serde::Serialize>(value: Option<&T>) -> Option<String> {
    value.and_then(json_text::encode)
}

// ── Users ──

pub async fn get_user_by_email(db: &dyn Storage, email: &str) -> Result<Option<User>> {
    let stmt = Statement::new("SELECT * FROM users WHERE email = $1").bind(email.to_lowercase());
    fetch_one(db, &stmt).await
}

pub async fn get_user(db: &dyn Storage, id: i64) -> Result<Option<User>> {
    fetch_one(db, &Statement::new("SELECT * FROM users WHERE id = $1").bind(id)).await
}

pub async fn create_user(
    db: &dyn Storage,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<User> {
    let stmt = Statement::new(
        "INSERT INTO users (email, password_hash, first_name, last_name, role)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(email.to_lowercase())
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(role);
    fetch_written(db, &stmt).await
}

pub async fn update_password(db: &dyn Storage, id: i64, password_hash: &str) -> Result<bool> {
    let stmt = Statement::new(
        "UPDATE users SET password_hash = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(password_hash)
    .bind(id);
    Ok(db.execute(&stmt).await?.changes.unwrap_or(0) > 0)
}

// ── Locations ──

pub async fn list_locations(db: &dyn Storage, active_only: bool) -> Result<Vec<Location>> {
    let mut qb = QueryBuilder::new("SELECT * FROM locations");
    if active_only {
        qb.and_eq("is_active", true);
    }
    qb.push(" ORDER BY name");
    fetch_all(db, &qb.build()).await
}

pub async fn get_location(db: &dyn Storage, id: i64) -> Result<Option<Location>> {
    fetch_one(db, &Statement::new("SELECT * FROM locations WHERE id = $1").bind(id)).await
}

pub async fn get_location_by_name(db: &dyn Storage, name: &str) -> Result<Option<Location>> {
    fetch_one(db, &Statement::new("SELECT * FROM locations WHERE name = $1").bind(name)).await
}

pub async fn create_location(db: &dyn Storage, loc: &NewLocation) -> Result<Location> {
    let stmt = Statement::new(
        "INSERT INTO locations (
            name, address, city, state, zip_code, phone, email,
            latitude, longitude, operating_hours, is_active
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *",
    )
    .bind(&loc.name)
    .bind(&loc.address)
    .bind(&loc.city)
    .bind(&loc.state)
    .bind(&loc.zip_code)
    .bind(loc.phone.clone())
    .bind(loc.email.clone())
    .bind(loc.latitude)
    .bind(loc.longitude)
    .bind(encoded(loc.operating_hours.as_ref()))
    .bind(loc.is_active.unwrap_or(true));
    fetch_written(db, &stmt).await
}

pub fn location_patch(patch: &LocationPatch) -> Patch {
    Patch::new("locations")
        .set("name", patch.name.clone())
        .set("address", patch.address.clone())
        .set("city", patch.city.clone())
        .set("state", patch.state.clone())
        .set("zip_code", patch.zip_code.clone())
        .set("phone", patch.phone.clone())
        .set("email", patch.email.clone())
        .set("latitude", patch.latitude)
        .set("longitude", patch.longitude)
        .set("operating_hours", encoded(patch.operating_hours.as_ref()))
        .set("is_active", patch.is_active)
}

/// Applies a patch and returns the updated row, or `None` if the id is unknown.
pub async fn apply_patch<T: serde::de::DeserializeOwned>(
    db: &dyn Storage,
    patch: Patch,
    id: i64,
) -> Result<Option<T>> {
    match patch.build(id) {
        Some(stmt) => fetch_one(db, &stmt).await,
        None => Ok(None),
    }
}

pub async fn toggle_location(db: &dyn Storage, id: i64) -> Result<Option<Location>> {
    let stmt = Statement::new(
        "UPDATE locations SET is_active = 1 - is_active, updated_at = CURRENT_TIMESTAMP
         WHERE id = $1 RETURNING *",
    )
    .bind(id);
    fetch_one(db, &stmt).await
}

pub async fn delete_location(db: &dyn Storage, id: i64) -> Result<Option<Location>> {
    fetch_one(db, &Statement::new("DELETE FROM locations WHERE id = $1 RETURNING *").bind(id)).await
}

/// (bookings, classes) that reference a location.
pub async fn location_references(db: &dyn Storage, id: i64) -> Result<(i64, i64)> {
    let bookings = count(
        db,
        &Statement::new("SELECT COUNT(*) AS total FROM bookings WHERE location_id = $1").bind(id),
    )
    .await?;
    let classes = count(
        db,
        &Statement::new("SELECT COUNT(*) AS total FROM classes WHERE location_id = $1").bind(id),
    )
    .await?;
    Ok((bookings, classes))
}

// ── Services ──

pub async fn list_services(
    db: &dyn Storage,
    category: Option<&str>,
    active_only: bool,
) -> Result<Vec<Service>> {
    let mut qb = QueryBuilder::new("SELECT * FROM services");
    if let Some(category) = category {
        qb.and_eq("category", category);
    }
    if active_only {
        qb.and_eq("is_active", true);
    }
    qb.push(" ORDER BY category, name");
    fetch_all(db, &qb.build()).await
}

pub async fn get_service(db: &dyn Storage, id: i64) -> Result<Option<Service>> {
    fetch_one(db, &Statement::new("SELECT * FROM services WHERE id = $1").bind(id)).await
}

pub async fn get_service_by_key(db: &dyn Storage, key: &str) -> Result<Option<Service>> {
    fetch_one(db, &Statement::new("SELECT * FROM services WHERE service_key = $1").bind(key)).await
}

pub async fn create_service(db: &dyn Storage, svc: &NewService) -> Result<Service> {
    let stmt = Statement::new(
        "INSERT INTO services (
            service_key, name, category, description, duration, price,
            durations, prices, is_active
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *",
    )
    .bind(svc.key())
    .bind(&svc.name)
    .bind(&svc.category)
    .bind(svc.description.clone())
    .bind(svc.duration)
    .bind(svc.price)
    .bind(encoded(svc.durations.as_ref()))
    .bind(encoded(svc.prices.as_ref()))
    .bind(svc.is_active.unwrap_or(true));
    fetch_written(db, &stmt).await
}

pub fn service_patch(patch: &ServicePatch) -> Patch {
    Patch::new("services")
        .set("name", patch.name.clone())
        .set("category", patch.category.clone())
        .set("description", patch.description.clone())
        .set("duration", patch.duration)
        .set("price", patch.price)
        .set("durations", encoded(patch.durations.as_ref()))
        .set("prices", encoded(patch.prices.as_ref()))
        .set("is_active", patch.is_active)
}

pub async fn delete_service(db: &dyn Storage, id: i64) -> Result<bool> {
    let result = db
        .execute(&Statement::new("DELETE FROM services WHERE id = $1 RETURNING id").bind(id))
        .await?;
    Ok(!result.rows.is_empty())
}

pub async fn service_booking_count(db: &dyn Storage, id: i64) -> Result<i64> {
    count(
        db,
        &Statement::new("SELECT COUNT(*) AS total FROM bookings WHERE service_id = $1").bind(id),
    )
    .await
}

pub async fn service_categories(db: &dyn Storage) -> Result<Vec<CategoryCount>> {
    let stmt = Statement::new(
        "SELECT category, COUNT(*) AS count FROM services
         WHERE is_active = 1 GROUP BY category ORDER BY category",
    );
    fetch_all(db, &stmt).await
}

// ── Classes ──

pub async fn list_classes(
    db: &dyn Storage,
    category: Option<&str>,
    active_only: bool,
) -> Result<Vec<Class>> {
    let mut qb = QueryBuilder::new("SELECT * FROM classes");
    if let Some(category) = category {
        qb.and_eq("category", category);
    }
    if active_only {
        qb.and_eq("is_active", true);
    }
    qb.push(" ORDER BY class_date DESC, start_time");
    fetch_all(db, &qb.build()).await
}

pub async fn get_class(db: &dyn Storage, id: i64) -> Result<Option<Class>> {
    fetch_one(db, &Statement::new("SELECT * FROM classes WHERE id = $1").bind(id)).await
}

pub async fn get_class_by_key(db: &dyn Storage, key: &str) -> Result<Option<Class>> {
    fetch_one(db, &Statement::new("SELECT * FROM classes WHERE course_key = $1").bind(key)).await
}

pub async fn create_class(db: &dyn Storage, class: &NewClass) -> Result<Class> {
    let stmt = Statement::new(
        "INSERT INTO classes (
            course_key, title, description, instructor, class_date, start_time, end_time,
            location_id, max_participants, price, category, is_active
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *",
    )
    .bind(class.course_key.clone())
    .bind(&class.title)
    .bind(class.description.clone())
    .bind(&class.instructor)
    .bind(&class.class_date)
    .bind(&class.start_time)
    .bind(&class.end_time)
    .bind(class.location_id)
    .bind(
        class
            .max_participants
            .unwrap_or(crate::models::class::DEFAULT_MAX_PARTICIPANTS),
    )
    .bind(class.price)
    .bind(class.category.clone())
    .bind(class.is_active.unwrap_or(true));
    fetch_written(db, &stmt).await
}

pub fn class_patch(patch: &ClassPatch) -> Patch {
    Patch::new("classes")
        .set("title", patch.title.clone())
        .set("description", patch.description.clone())
        .set("instructor", patch.instructor.clone())
        .set("class_date", patch.class_date.clone())
        .set("start_time", patch.start_time.clone())
        .set("end_time", patch.end_time.clone())
        .set("location_id", patch.location_id)
        .set("max_participants", patch.max_participants)
        .set("price", patch.price)
        .set("category", patch.category.clone())
        .set("is_active", patch.is_active)
}

pub async fn delete_class(db: &dyn Storage, id: i64) -> Result<bool> {
    let result = db
        .execute(&Statement::new("DELETE FROM classes WHERE id = $1 RETURNING id").bind(id))
        .await?;
    Ok(!result.rows.is_empty())
}

pub async fn class_enrollment_count(db: &dyn Storage, id: i64) -> Result<i64> {
    count(
        db,
        &Statement::new("SELECT COUNT(*) AS total FROM class_enrollments WHERE class_id = $1")
            .bind(id),
    )
    .await
}

/// Takes one seat if any are left. The capacity test and the increment are a
/// single statement, so two callers cannot both take the last seat.
pub async fn reserve_seat(db: &dyn Storage, class_id: i64) -> Result<bool> {
    let stmt = Statement::new(
        "UPDATE classes
         SET current_participants = current_participants + 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $1 AND current_participants < max_participants",
    )
    .bind(class_id);
    Ok(db.execute(&stmt).await?.changes.unwrap_or(0) > 0)
}

pub async fn release_seat(db: &dyn Storage, class_id: i64) -> Result<bool> {
    let stmt = Statement::new(
        "UPDATE classes
         SET current_participants = current_participants - 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $1 AND current_participants > 0",
    )
    .bind(class_id);
    Ok(db.execute(&stmt).await?.changes.unwrap_or(0) > 0)
}

// ── Bookings ──

/// Start times of non-cancelled bookings on a date, optionally for one location.
pub async fn booked_times(
    db: &dyn Storage,
    date: &str,
    location_id: Option<i64>,
) -> Result<Vec<String>> {
    let mut qb = QueryBuilder::new("SELECT appointment_time FROM bookings");
    qb.and_eq("appointment_date", date);
    qb.and_where("status <> ").push_bind(BookingStatus::Cancelled.as_str());
    if let Some(location_id) = location_id {
        qb.and_eq("location_id", location_id);
    }
    qb.push(" ORDER BY appointment_time");

    let rows = db.execute(&qb.build()).await?.rows;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("appointment_time").and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect())
}

pub async fn find_live_booking(
    db: &dyn Storage,
    location_id: i64,
    date: &str,
    time: &str,
) -> Result<Option<i64>> {
    let stmt = Statement::new(
        "SELECT id FROM bookings
         WHERE location_id = $1 AND appointment_date = $2 AND appointment_time = $3
         AND status <> $4",
    )
    .bind(location_id)
    .bind(date)
    .bind(time)
    .bind(BookingStatus::Cancelled.as_str());
    let result = db.execute(&stmt).await?;
    Ok(result.scalar_i64("id"))
}

pub async fn create_booking(db: &dyn Storage, booking: &NewBooking) -> Result<Booking> {
    let stmt = Statement::new(
        "INSERT INTO bookings (
            client_first_name, client_last_name, client_email, client_phone,
            service_id, location_id, appointment_date, appointment_time,
            duration, price, status, payment_status, notes
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *",
    )
    .bind(&booking.client_first_name)
    .bind(&booking.client_last_name)
    .bind(&booking.client_email)
    .bind(&booking.client_phone)
    .bind(booking.service_id)
    .bind(booking.location_id)
    .bind(&booking.appointment_date)
    .bind(&booking.appointment_time)
    .bind(booking.duration)
    .bind(booking.price)
    .bind(BookingStatus::Pending.as_str())
    .bind(PaymentStatus::Pending.as_str())
    .bind(booking.notes.clone().unwrap_or_default());
    fetch_written(db, &stmt).await
}

pub async fn get_booking(db: &dyn Storage, id: i64) -> Result<Option<Booking>> {
    fetch_one(db, &Statement::new("SELECT * FROM bookings WHERE id = $1").bind(id)).await
}

pub async fn update_booking_status(
    db: &dyn Storage,
    id: i64,
    status: Option<BookingStatus>,
    payment_status: Option<PaymentStatus>,
) -> Result<Option<Booking>> {
    let patch = Patch::new("bookings")
        .set("status", status.map(|s| s.as_str()))
        .set("payment_status", payment_status.map(|s| s.as_str()));
    apply_patch(db, patch, id).await
}

pub async fn delete_booking(db: &dyn Storage, id: i64) -> Result<bool> {
    let result = db
        .execute(&Statement::new("DELETE FROM bookings WHERE id = $1 RETURNING id").bind(id))
        .await?;
    Ok(!result.rows.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<String>,
    pub location_id: Option<i64>,
}

impl BookingFilter {
    fn apply(&self, qb: &mut QueryBuilder) {
        if let Some(status) = self.status {
            qb.and_eq("b.status", status.as_str());
        }
        if let Some(date) = &self.date {
            qb.and_eq("b.appointment_date", date.as_str());
        }
        if let Some(location_id) = self.location_id {
            qb.and_eq("b.location_id", location_id);
        }
    }
}

/// One page of bookings plus the number of rows matching the same filter.
pub async fn list_bookings(
    db: &dyn Storage,
    filter: &BookingFilter,
    page: &PageRequest,
) -> Result<(Vec<BookingSummary>, i64)> {
    let mut qb = QueryBuilder::new(
        "SELECT
            b.id, s.name AS service_type, b.duration,
            b.appointment_date, b.appointment_time, l.name AS location,
            b.client_first_name, b.client_last_name, b.client_email, b.client_phone,
            b.price AS total_amount, b.status, b.payment_status, b.notes AS special_notes,
            b.created_at, b.updated_at
        FROM bookings b
        LEFT JOIN services s ON b.service_id = s.id
        LEFT JOIN locations l ON b.location_id = l.id",
    );
    filter.apply(&mut qb);
    qb.push(" ORDER BY b.appointment_date DESC, b.appointment_time DESC, b.id DESC")
        .push_page(page);
    let rows = fetch_all(db, &qb.build()).await?;

    let mut total = QueryBuilder::new("SELECT COUNT(*) AS total FROM bookings b");
    filter.apply(&mut total);
    let total = count(db, &total.build()).await?;

    Ok((rows, total))
}

// ── Enrollments ──

pub async fn create_enrollment(
    db: &dyn Storage,
    enrollment: &NewEnrollment,
    payment_status: PaymentStatus,
    scheduled_date: &str,
) -> Result<Enrollment> {
    let stmt = Statement::new(
        "INSERT INTO class_enrollments (
            class_id, scheduled_date, participant_first_name, participant_last_name,
            participant_email, participant_phone, payment_status, status, total_amount
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *",
    )
    .bind(enrollment.class_id)
    .bind(scheduled_date)
    .bind(&enrollment.participant_first_name)
    .bind(&enrollment.participant_last_name)
    .bind(&enrollment.participant_email)
    .bind(&enrollment.participant_phone)
    .bind(payment_status.as_str())
    .bind(BookingStatus::Confirmed.as_str())
    .bind(enrollment.total_amount);
    fetch_written(db, &stmt).await
}

pub async fn get_enrollment(db: &dyn Storage, id: i64) -> Result<Option<Enrollment>> {
    fetch_one(db, &Statement::new("SELECT * FROM class_enrollments WHERE id = $1").bind(id)).await
}

pub async fn update_enrollment_status(
    db: &dyn Storage,
    id: i64,
    status: Option<BookingStatus>,
    payment_status: Option<PaymentStatus>,
) -> Result<Option<Enrollment>> {
    let patch = Patch::new("class_enrollments")
        .set("status", status.map(|s| s.as_str()))
        .set("payment_status", payment_status.map(|s| s.as_str()));
    apply_patch(db, patch, id).await
}

#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub payment_status: Option<PaymentStatus>,
    pub class_title: Option<String>,
}

impl EnrollmentFilter {
    fn apply(&self, qb: &mut QueryBuilder) {
        if let Some(status) = self.payment_status {
            qb.and_eq("ce.payment_status", status.as_str());
        }
        if let Some(title) = &self.class_title {
            qb.and_eq("c.title", title.as_str());
        }
    }
}

pub async fn list_enrollments(
    db: &dyn Storage,
    filter: &EnrollmentFilter,
    page: &PageRequest,
) -> Result<(Vec<EnrollmentSummary>, i64)> {
    let mut qb = QueryBuilder::new(
        "SELECT
            ce.id, ce.class_id, c.title AS class_title, ce.scheduled_date,
            ce.participant_first_name, ce.participant_last_name,
            ce.participant_email, ce.participant_phone,
            ce.payment_status, ce.status, ce.total_amount, ce.enrollment_date AS created_at
        FROM class_enrollments ce
        JOIN classes c ON ce.class_id = c.id",
    );
    filter.apply(&mut qb);
    qb.push(" ORDER BY ce.enrollment_date DESC, ce.id DESC").push_page(page);
    let rows = fetch_all(db, &qb.build()).await?;

    let mut total = QueryBuilder::new(
        "SELECT COUNT(*) AS total FROM class_enrollments ce JOIN classes c ON ce.class_id = c.id",
    );
    filter.apply(&mut total);
    let total = count(db, &total.build()).await?;

    Ok((rows, total))
}
