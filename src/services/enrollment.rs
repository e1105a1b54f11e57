use crate::db::queries;
use crate::db::storage::Storage;
use crate::models::{BookingStatus, Enrollment, NewEnrollment, PaymentStatus};

use super::scheduling::SchedulingError;

/// Takes a seat and records the participant. The seat is taken first with a
/// guarded increment; if the insert then fails the seat is handed back.
pub async fn enroll(db: &dyn Storage, req: &NewEnrollment) -> Result<Enrollment, SchedulingError> {
    let class = queries::get_class(db, req.class_id)
        .await?
        .ok_or(SchedulingError::NotFound("Class"))?;
    if !class.is_active {
        return Err(SchedulingError::Rejected(
            "Class is not open for registration".to_string(),
        ));
    }
    if class.is_full() {
        return Err(SchedulingError::ClassFull);
    }

    let payment_status = req.payment_status().map_err(SchedulingError::Rejected)?;

    if !queries::reserve_seat(db, class.id).await? {
        return Err(SchedulingError::ClassFull);
    }

    let scheduled_date = req.scheduled_date.as_deref().unwrap_or(&class.class_date);
    match queries::create_enrollment(db, req, payment_status, scheduled_date).await {
        Ok(enrollment) => {
            tracing::info!(
                enrollment_id = enrollment.id,
                class_id = class.id,
                "enrollment created"
            );
            Ok(enrollment)
        }
        Err(e) => {
            if let Err(release) = queries::release_seat(db, class.id).await {
                tracing::error!(class_id = class.id, error = %release, "failed to release seat");
            }
            Err(e.into())
        }
    }
}

/// Updates status fields. Moving into `cancelled` gives the seat back;
/// moving out of it takes a seat again, which fails when the class filled up.
/// The seat moves before the status is written and is moved back if the write
/// does not land, so the counter never drifts from the live enrollments.
pub async fn update_status(
    db: &dyn Storage,
    id: i64,
    status: Option<BookingStatus>,
    payment_status: Option<PaymentStatus>,
) -> Result<Enrollment, SchedulingError> {
    let current = queries::get_enrollment(db, id)
        .await?
        .ok_or(SchedulingError::NotFound("Registration"))?;
    let class_id = current.class_id;

    let was_cancelled = current.status == BookingStatus::Cancelled;
    let cancelling = !was_cancelled && status == Some(BookingStatus::Cancelled);
    let reinstating = was_cancelled && matches!(status, Some(s) if s != BookingStatus::Cancelled);

    let seat = if reinstating {
        if !queries::reserve_seat(db, class_id).await? {
            return Err(SchedulingError::ClassFull);
        }
        SeatChange::Taken
    } else if cancelling && queries::release_seat(db, class_id).await? {
        SeatChange::Released
    } else {
        SeatChange::Unchanged
    };

    let result = match queries::update_enrollment_status(db, id, status, payment_status).await {
        Ok(Some(updated)) => return Ok(updated),
        Ok(None) => SchedulingError::NotFound("Registration"),
        Err(e) => e.into(),
    };

    seat.undo(db, class_id).await;
    Err(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatChange {
    Unchanged,
    Taken,
    Released,
}

impl SeatChange {
    async fn undo(self, db: &dyn Storage, class_id: i64) {
        let undone = match self {
            SeatChange::Unchanged => return,
            SeatChange::Taken => queries::release_seat(db, class_id).await,
            SeatChange::Released => queries::reserve_seat(db, class_id).await,
        };
        match undone {
            Ok(true) => {}
            Ok(false) => tracing::error!(class_id, change = ?self, "seat could not be restored"),
            Err(e) => tracing::error!(class_id, change = ?self, error = %e, "failed to restore seat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::db::schema;
    use crate::db::sqlite::SqliteStore;
    use crate::db::storage::{Backend, QueryResult, Statement, StorageError};
    use crate::models::{NewClass, NewLocation};

    /// Shares the in-memory database but fails every statement starting with `fail_on`.
    struct FailingStore {
        inner: SqliteStore,
        fail_on: &'static str,
    }

    #[async_trait]
    impl Storage for FailingStore {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }

        async fn execute(&self, stmt: &Statement) -> Result<QueryResult, StorageError> {
            if stmt.sql.starts_with(self.fail_on) {
                return Err(StorageError::other(Backend::Sqlite, "disk I/O error"));
            }
            self.inner.execute(stmt).await
        }
    }

    async fn setup_db(max_participants: i64) -> SqliteStore {
        let db = SqliteStore::in_memory().unwrap();
        schema::create(&db).await.unwrap();
        queries::create_location(
            &db,
            &NewLocation {
                name: "Bethlehem Office".into(),
                address: "610 West Broad St".into(),
                city: "Bethlehem".into(),
                state: "PA".into(),
                zip_code: "18018".into(),
                phone: None,
                email: None,
                latitude: None,
                longitude: None,
                operating_hours: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
        queries::create_class(
            &db,
            &NewClass {
                course_key: None,
                title: "CPR/First Aid/AED Certification".into(),
                description: None,
                instructor: "T. Young".into(),
                class_date: "2024-01-15".into(),
                start_time: "09:00".into(),
                end_time: "17:00".into(),
                location_id: 1,
                max_participants: Some(max_participants),
                price: 75.0,
                category: Some("cpr".into()),
                is_active: None,
            },
        )
        .await
        .unwrap();
        db
    }

    fn registration(email: &str) -> NewEnrollment {
        NewEnrollment {
            class_id: 1,
            scheduled_date: None,
            participant_first_name: "Grace".into(),
            participant_last_name: "Hopper".into(),
            participant_email: email.into(),
            participant_phone: "5559876543".into(),
            payment_status: None,
            total_amount: 75.0,
        }
    }

    async fn participants(db: &SqliteStore) -> i64 {
        queries::get_class(db, 1).await.unwrap().unwrap().current_participants
    }

    #[tokio::test]
    async fn test_enroll_counts_seat() {
        let db = setup_db(2).await;
        let enrollment = enroll(&db, &registration("a@example.com")).await.unwrap();
        assert_eq!(enrollment.scheduled_date.as_deref(), Some("2024-01-15"));
        assert_eq!(enrollment.payment_status, PaymentStatus::Pending);
        assert_eq!(participants(&db).await, 1);
    }

    #[tokio::test]
    async fn test_full_class_rejected_without_mutation() {
        let db = setup_db(1).await;
        enroll(&db, &registration("a@example.com")).await.unwrap();

        let second = enroll(&db, &registration("b@example.com")).await;
        assert!(matches!(second, Err(SchedulingError::ClassFull)));
        assert_eq!(participants(&db).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_class() {
        let db = setup_db(1).await;
        let mut req = registration("a@example.com");
        req.class_id = 9;
        assert!(matches!(
            enroll(&db, &req).await,
            Err(SchedulingError::NotFound("Class"))
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_and_reinstate_retakes_seat() {
        let db = setup_db(1).await;
        let first = enroll(&db, &registration("a@example.com")).await.unwrap();

        update_status(&db, first.id, Some(BookingStatus::Cancelled), None)
            .await
            .unwrap();
        assert_eq!(participants(&db).await, 0);

        // Cancelling twice does not free a second seat
        update_status(&db, first.id, Some(BookingStatus::Cancelled), None)
            .await
            .unwrap();
        assert_eq!(participants(&db).await, 0);

        let second = enroll(&db, &registration("b@example.com")).await.unwrap();
        assert_eq!(participants(&db).await, 1);

        let reinstated = update_status(&db, first.id, Some(BookingStatus::Confirmed), None).await;
        assert!(matches!(reinstated, Err(SchedulingError::ClassFull)));

        let paid = update_status(&db, second.id, None, Some(PaymentStatus::Paid))
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_failed_cancel_keeps_seat() {
        let db = setup_db(2).await;
        let first = enroll(&db, &registration("a@example.com")).await.unwrap();
        let failing = FailingStore {
            inner: db.clone(),
            fail_on: "UPDATE class_enrollments",
        };

        let result = update_status(&failing, first.id, Some(BookingStatus::Cancelled), None).await;
        assert!(matches!(result, Err(SchedulingError::Storage(_))));
        assert_eq!(participants(&db).await, 1);
        let row = queries::get_enrollment(&db, first.id).await.unwrap().unwrap();
        assert_ne!(row.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_failed_seat_release_leaves_enrollment_live() {
        let db = setup_db(2).await;
        let first = enroll(&db, &registration("a@example.com")).await.unwrap();
        let failing = FailingStore {
            inner: db.clone(),
            fail_on: "UPDATE classes",
        };

        let result = update_status(&failing, first.id, Some(BookingStatus::Cancelled), None).await;
        assert!(result.is_err());
        assert_eq!(participants(&db).await, 1);
        let row = queries::get_enrollment(&db, first.id).await.unwrap().unwrap();
        assert_ne!(row.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_failed_reinstate_hands_seat_back() {
        let db = setup_db(2).await;
        let first = enroll(&db, &registration("a@example.com")).await.unwrap();
        update_status(&db, first.id, Some(BookingStatus::Cancelled), None)
            .await
            .unwrap();
        assert_eq!(participants(&db).await, 0);

        let failing = FailingStore {
            inner: db.clone(),
            fail_on: "UPDATE class_enrollments",
        };
        let result = update_status(&failing, first.id, Some(BookingStatus::Confirmed), None).await;
        assert!(matches!(result, Err(SchedulingError::Storage(_))));
        assert_eq!(participants(&db).await, 0);
    }
}
