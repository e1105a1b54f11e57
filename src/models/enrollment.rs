use serde::{Deserialize, Serialize};

use super::booking::{BookingStatus, PaymentStatus};
use super::validation::{ensure, is_email, is_iso_date, not_blank, valid_price, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub class_id: i64,
    pub scheduled_date: Option<String>,
    pub participant_first_name: String,
    pub participant_last_name: String,
    pub participant_email: String,
    pub participant_phone: String,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub total_amount: f64,
    #[serde(default)]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Admin listing row, joined with the class title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentSummary {
    pub id: i64,
    pub class_id: i64,
    pub class_title: String,
    pub scheduled_date: Option<String>,
    pub participant_first_name: String,
    pub participant_last_name: String,
    pub participant_email: String,
    pub participant_phone: String,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub total_amount: f64,
    #[serde(default)]
    pub created_at: Option<String>,
}

// POST /api/classes/register
#[derive(Debug, Clone, Deserialize)]
pub struct NewEnrollment {
    pub class_id: i64,
    pub scheduled_date: Option<String>,
    pub participant_first_name: String,
    pub participant_last_name: String,
    pub participant_email: String,
    pub participant_phone: String,
    pub payment_status: Option<String>,
    pub total_amount: f64,
}

impl NewEnrollment {
    pub fn payment_status(&self) -> Result<PaymentStatus, String> {
        match self.payment_status.as_deref() {
            None => Ok(PaymentStatus::Pending),
            Some(s) => PaymentStatus::parse(s).ok_or_else(|| "Invalid payment status".to_string()),
        }
    }
}

impl Validate for NewEnrollment {
    fn validate(&self) -> Result<(), String> {
        ensure(self.class_id > 0, "class_id must be a positive integer")?;
        if let Some(date) = &self.scheduled_date {
            ensure(is_iso_date(date), "scheduled_date must be YYYY-MM-DD")?;
        }
        ensure(
            not_blank(&self.participant_first_name),
            "participant_first_name is required",
        )?;
        ensure(
            not_blank(&self.participant_last_name),
            "participant_last_name is required",
        )?;
        ensure(
            is_email(&self.participant_email),
            "participant_email must be a valid email address",
        )?;
        ensure(
            self.participant_phone.trim().len() >= 7,
            "participant_phone must be at least 7 characters",
        )?;
        self.payment_status()?;
        ensure(valid_price(self.total_amount), "total_amount must be non-negative")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_defaults_to_pending() {
        let body: NewEnrollment = serde_json::from_value(serde_json::json!({
            "class_id": 1,
            "participant_first_name": "Grace",
            "participant_last_name": "Hopper",
            "participant_email": "grace@example.com",
            "participant_phone": "5559876543",
            "total_amount": 75.0
        }))
        .unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.payment_status().unwrap(), PaymentStatus::Pending);
    }

    #[test]
    fn test_rejects_unknown_payment_status() {
        let body: NewEnrollment = serde_json::from_value(serde_json::json!({
            "class_id": 1,
            "participant_first_name": "Grace",
            "participant_last_name": "Hopper",
            "participant_email": "grace@example.com",
            "participant_phone": "5559876543",
            "payment_status": "comped",
            "total_amount": 0.0
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }
}
