use serde::{Deserialize, Serialize};

use super::columns::{flag, optional_flag};
use super::validation::{ensure, is_hhmm, is_iso_date, not_blank, valid_price, Validate};

pub const DEFAULT_MAX_PARTICIPANTS: i64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    #[serde(default)]
    pub course_key: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub instructor: String,
    pub class_date: String,
    pub start_time: String,
    pub end_time: String,
    pub location_id: i64,
    pub max_participants: i64,
    pub current_participants: i64,
    pub price: f64,
    pub category: Option<String>,
    #[serde(with = "flag")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Class {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

// POST /api/classes
#[derive(Debug, Clone, Deserialize)]
pub struct NewClass {
    pub course_key: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub instructor: String,
    pub class_date: String,
    pub start_time: String,
    pub end_time: String,
    pub location_id: i64,
    pub max_participants: Option<i64>,
    pub price: f64,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl Validate for NewClass {
    fn validate(&self) -> Result<(), String> {
        ensure(not_blank(&self.title), "title is required")?;
        ensure(not_blank(&self.instructor), "instructor is required")?;
        ensure(is_iso_date(&self.class_date), "class_date must be YYYY-MM-DD")?;
        ensure(is_hhmm(&self.start_time), "start_time must be HH:MM")?;
        ensure(is_hhmm(&self.end_time), "end_time must be HH:MM")?;
        ensure(self.start_time < self.end_time, "start_time must be before end_time")?;
        ensure(self.location_id > 0, "location_id must be a positive integer")?;
        if let Some(max) = self.max_participants {
            ensure(max > 0, "max_participants must be positive")?;
        }
        ensure(valid_price(self.price), "price must be non-negative")
    }
}

// PUT /api/classes/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location_id: Option<i64>,
    pub max_participants: Option<i64>,
    pub price: Option<f64>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl Validate for ClassPatch {
    fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            ensure(not_blank(title), "title cannot be empty")?;
        }
        if let Some(instructor) = &self.instructor {
            ensure(not_blank(instructor), "instructor cannot be empty")?;
        }
        if let Some(date) = &self.class_date {
            ensure(is_iso_date(date), "class_date must be YYYY-MM-DD")?;
        }
        if let Some(start) = &self.start_time {
            ensure(is_hhmm(start), "start_time must be HH:MM")?;
        }
        if let Some(end) = &self.end_time {
            ensure(is_hhmm(end), "end_time must be HH:MM")?;
        }
        if let Some(location_id) = self.location_id {
            ensure(location_id > 0, "location_id must be a positive integer")?;
        }
        if let Some(max) = self.max_participants {
            ensure(max > 0, "max_participants must be positive")?;
        }
        if let Some(price) = self.price {
            ensure(valid_price(price), "price must be non-negative")?;
        }
        Ok(())
    }
}
