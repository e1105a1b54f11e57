use serde::{Deserialize, Serialize};

use super::validation::{
    ensure, is_email, is_hhmm, is_iso_date, not_blank, valid_duration, valid_price, Validate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: i64,
    pub location_id: i64,
    pub appointment_date: String,
    pub appointment_time: String,
    pub duration: i64,
    pub price: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Admin listing row, joined with service and location names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSummary {
    pub id: i64,
    pub service_type: Option<String>,
    pub duration: i64,
    pub appointment_date: String,
    pub appointment_time: String,
    pub location: Option<String>,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub special_notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// `completed` is terminal; every other status may move anywhere.
    pub fn can_become(&self, next: BookingStatus) -> bool {
        *self != BookingStatus::Completed || next == BookingStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

// POST /api/booking
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub service_id: i64,
    pub duration: i64,
    pub appointment_date: String,
    pub appointment_time: String,
    pub location_id: i64,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub notes: Option<String>,
    pub price: f64,
}

impl Validate for NewBooking {
    fn validate(&self) -> Result<(), String> {
        ensure(self.service_id > 0, "service_id must be a positive integer")?;
        ensure(self.location_id > 0, "location_id must be a positive integer")?;
        ensure(
            valid_duration(self.duration),
            "duration must be between 15 and 300 minutes",
        )?;
        ensure(
            is_iso_date(&self.appointment_date),
            "appointment_date must be YYYY-MM-DD",
        )?;
        ensure(is_hhmm(&self.appointment_time), "appointment_time must be HH:MM")?;
        ensure(not_blank(&self.client_first_name), "client_first_name is required")?;
        ensure(not_blank(&self.client_last_name), "client_last_name is required")?;
        ensure(is_email(&self.client_email), "client_email must be a valid email address")?;
        ensure(
            self.client_phone.trim().len() >= 7,
            "client_phone must be at least 7 characters",
        )?;
        if let Some(notes) = &self.notes {
            ensure(notes.chars().count() <= 2000, "notes must be at most 2000 characters")?;
        }
        ensure(valid_price(self.price), "price must be non-negative")
    }
}

/// Body of `PATCH|PUT /:id/status`. Either field may be omitted, but not both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

impl StatusUpdate {
    pub fn parse(&self) -> Result<(Option<BookingStatus>, Option<PaymentStatus>), String> {
        if self.status.is_none() && self.payment_status.is_none() {
            return Err("Status is required".to_string());
        }
        let status = self
            .status
            .as_deref()
            .map(|s| BookingStatus::parse(s).ok_or_else(|| "Invalid status".to_string()))
            .transpose()?;
        let payment_status = self
            .payment_status
            .as_deref()
            .map(|s| PaymentStatus::parse(s).ok_or_else(|| "Invalid payment status".to_string()))
            .transpose()?;
        Ok((status, payment_status))
    }
}

impl Validate for StatusUpdate {
    fn validate(&self) -> Result<(), String> {
        self.parse().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("done"), None);
    }

    #[test]
    fn test_completed_is_terminal() {
        use BookingStatus::*;
        assert!(Pending.can_become(Cancelled));
        assert!(Confirmed.can_become(Completed));
        assert!(Cancelled.can_become(Confirmed));
        assert!(Completed.can_become(Completed));
        assert!(!Completed.can_become(Cancelled));
        assert!(!Completed.can_become(Pending));
    }

    #[test]
    fn test_status_update_validation() {
        let empty = StatusUpdate::default();
        assert_eq!(empty.parse().unwrap_err(), "Status is required");

        let bad = StatusUpdate {
            status: Some("archived".into()),
            payment_status: None,
        };
        assert_eq!(bad.parse().unwrap_err(), "Invalid status");

        let bad_payment = StatusUpdate {
            status: None,
            payment_status: Some("void".into()),
        };
        assert_eq!(bad_payment.parse().unwrap_err(), "Invalid payment status");

        let ok = StatusUpdate {
            status: Some("confirmed".into()),
            payment_status: Some("paid".into()),
        };
        assert_eq!(
            ok.parse().unwrap(),
            (Some(BookingStatus::Confirmed), Some(PaymentStatus::Paid))
        );
    }

    #[test]
    fn test_new_booking_validation() {
        let body: NewBooking = serde_json::from_value(serde_json::json!({
            "service_id": 1,
            "duration": 60,
            "appointment_date": "2024-10-20",
            "appointment_time": "2pm",
            "location_id": 1,
            "client_first_name": "Ada",
            "client_last_name": "Lovelace",
            "client_email": "ada@example.com",
            "client_phone": "5551234567",
            "price": 90.0
        }))
        .unwrap();
        assert_eq!(body.validate().unwrap_err(), "appointment_time must be HH:MM");
    }
}
