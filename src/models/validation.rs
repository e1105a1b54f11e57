use chrono::{NaiveDate, NaiveTime};

/// Request bodies check their own shape before any storage work happens.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

pub fn ensure(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Strict `YYYY-MM-DD`.
pub fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Strict 24-hour `HH:MM`.
pub fn is_hhmm(s: &str) -> bool {
    s.len() == 5 && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

pub fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn not_blank(s: &str) -> bool {
    !s.trim().is_empty()
}

pub fn valid_duration(minutes: i64) -> bool {
    (15..=300).contains(&minutes)
}

pub fn valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}
