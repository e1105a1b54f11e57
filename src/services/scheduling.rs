use chrono::NaiveDate;

use crate::db::queries;
use crate::db::storage::{Storage, StorageError};
use crate::models::availability::default_grid;
use crate::models::{Booking, DaySchedule, NewBooking};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Time slot is already booked")]
    SlotTaken,

    #[error("Class is full")]
    ClassFull,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Free and taken start times for a day. With a location the grid follows its
/// weekly hours; the default day is used when it has none on record, when the
/// location is unknown, or when no location is given (bookings at every
/// location then count).
pub async fn availability(
    db: &dyn Storage,
    date: NaiveDate,
    location_id: Option<i64>,
    duration_minutes: i64,
) -> Result<DaySchedule, SchedulingError> {
    let location = match location_id {
        Some(id) => queries::get_location(db, id).await?,
        None => None,
    };
    let grid = match location.and_then(|l| l.operating_hours) {
        Some(hours) if !hours.0.is_empty() => hours.grid_for(date, duration_minutes),
        _ => default_grid(duration_minutes),
    };

    let date = date.format("%Y-%m-%d").to_string();
    let booked = queries::booked_times(db, &date, location_id).await?;
    Ok(DaySchedule::new(grid, booked))
}

/// Check for a live booking at the slot, then insert. The live-slot unique
/// index closes the window between the two; a violation there is reported the
/// same way as the check.
pub async fn create_booking(db: &dyn Storage, req: &NewBooking) -> Result<Booking, SchedulingError> {
    if queries::get_service(db, req.service_id).await?.is_none() {
        return Err(SchedulingError::NotFound("Service"));
    }
    if queries::get_location(db, req.location_id).await?.is_none() {
        return Err(SchedulingError::NotFound("Location"));
    }

    let existing = queries::find_live_booking(
        db,
        req.location_id,
        &req.appointment_date,
        &req.appointment_time,
    )
    .await?;
    if let Some(id) = existing {
        tracing::debug!(existing_id = id, "slot already booked");
        return Err(SchedulingError::SlotTaken);
    }

    match queries::create_booking(db, req).await {
        Ok(booking) => {
            tracing::info!(
                booking_id = booking.id,
                location_id = booking.location_id,
                date = %booking.appointment_date,
                time = %booking.appointment_time,
                "booking created"
            );
            Ok(booking)
        }
        Err(e) if e.is_unique_violation() => Err(SchedulingError::SlotTaken),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::db::sqlite::SqliteStore;
    use crate::models::{BookingStatus, NewLocation, NewService, OperatingHours};

    async fn setup_db() -> SqliteStore {
        let db = SqliteStore::in_memory().unwrap();
        schema::create(&db).await.unwrap();
        queries::create_location(&db, &location(Some(OperatingHours::standard_week())))
            .await
            .unwrap();
        queries::create_location(&db, &location(None)).await.unwrap();
        queries::create_service(
            &db,
            &NewService {
                service_key: None,
                name: "Swedish Massage".into(),
                category: "massage".into(),
                description: None,
                duration: 60,
                price: 90.0,
                durations: None,
                prices: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
        db
    }

    fn location(hours: Option<OperatingHours>) -> NewLocation {
        NewLocation {
            name: format!("Office {}", hours.is_some()),
            address: "1 Main St".into(),
            city: "Bethlehem".into(),
            state: "PA".into(),
            zip_code: "18018".into(),
            phone: None,
            email: None,
            latitude: None,
            longitude: None,
            operating_hours: hours,
            is_active: None,
        }
    }

    fn booking(location_id: i64, date: &str, time: &str) -> NewBooking {
        NewBooking {
            service_id: 1,
            duration: 60,
            appointment_date: date.into(),
            appointment_time: time.into(),
            location_id,
            client_first_name: "Ada".into(),
            client_last_name: "Lovelace".into(),
            client_email: "ada@example.com".into(),
            client_phone: "5551234567".into(),
            notes: None,
            price: 90.0,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_double_booking_rejected() {
        let db = setup_db().await;
        create_booking(&db, &booking(1, "2024-10-20", "14:00")).await.unwrap();
        let second = create_booking(&db, &booking(1, "2024-10-20", "14:00")).await;
        assert!(matches!(second, Err(SchedulingError::SlotTaken)));

        // Same time at another location is fine
        create_booking(&db, &booking(2, "2024-10-20", "14:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_slot() {
        let db = setup_db().await;
        let first = create_booking(&db, &booking(1, "2024-10-21", "10:00")).await.unwrap();
        queries::update_booking_status(&db, first.id, Some(BookingStatus::Cancelled), None)
            .await
            .unwrap();
        let again = create_booking(&db, &booking(1, "2024-10-21", "10:00")).await.unwrap();
        assert_ne!(again.id, first.id);
        assert_eq!(again.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_references() {
        let db = setup_db().await;
        let mut req = booking(1, "2024-10-21", "10:00");
        req.service_id = 99;
        assert!(matches!(
            create_booking(&db, &req).await,
            Err(SchedulingError::NotFound("Service"))
        ));
        assert!(matches!(
            create_booking(&db, &booking(99, "2024-10-21", "10:00")).await,
            Err(SchedulingError::NotFound("Location"))
        ));
    }

    #[tokio::test]
    async fn test_availability_subtracts_live_bookings() {
        let db = setup_db().await;
        create_booking(&db, &booking(1, "2024-10-21", "10:00")).await.unwrap();
        let cancelled = create_booking(&db, &booking(1, "2024-10-21", "11:00")).await.unwrap();
        queries::update_booking_status(&db, cancelled.id, Some(BookingStatus::Cancelled), None)
            .await
            .unwrap();

        let day = availability(&db, date("2024-10-21"), Some(1), 60).await.unwrap();
        assert_eq!(day.booked_slots, vec!["10:00"]);
        assert!(!day.available_slots.contains(&"10:00".to_string()));
        assert!(day.available_slots.contains(&"11:00".to_string()));
    }

    #[tokio::test]
    async fn test_availability_follows_location_hours() {
        let db = setup_db().await;
        // Sunday: closed at the location with hours, default day elsewhere
        let closed = availability(&db, date("2024-10-20"), Some(1), 60).await.unwrap();
        assert!(closed.available_slots.is_empty());

        let default = availability(&db, date("2024-10-20"), Some(2), 60).await.unwrap();
        assert_eq!(default.available_slots, default_grid(60));

        let unfiltered = availability(&db, date("2024-10-20"), None, 60).await.unwrap();
        assert_eq!(unfiltered.available_slots, default_grid(60));

        let unknown = availability(&db, date("2024-10-20"), Some(42), 60).await.unwrap();
        assert_eq!(unknown.available_slots, default_grid(60));
        assert!(unknown.booked_slots.is_empty());
    }

    #[tokio::test]
    async fn test_fully_booked_day() {
        let db = setup_db().await;
        let grid = default_grid(60);
        for (i, slot) in grid.iter().enumerate() {
            let mut req = booking(2, "2024-10-22", slot);
            req.client_email = format!("client{i}@example.com");
            create_booking(&db, &req).await.unwrap();
        }

        let day = availability(&db, date("2024-10-22"), Some(2), 60).await.unwrap();
        assert!(day.available_slots.is_empty());
        assert_eq!(day.booked_slots, grid);
    }
}
