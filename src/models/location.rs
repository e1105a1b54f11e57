use serde::{Deserialize, Serialize};

use super::availability::OperatingHours;
use super::columns::{flag, json_text, optional_flag};
use super::validation::{ensure, is_email, not_blank, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(with = "flag")]
    pub is_active: bool,
    #[serde(default, with = "json_text")]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// POST /api/locations
#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operating_hours: Option<OperatingHours>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl Validate for NewLocation {
    fn validate(&self) -> Result<(), String> {
        ensure(not_blank(&self.name), "name is required")?;
        ensure(not_blank(&self.address), "address is required")?;
        ensure(not_blank(&self.city), "city is required")?;
        ensure(self.state.trim().len() >= 2, "state must be at least 2 characters")?;
        ensure(self.zip_code.trim().len() >= 3, "zip_code must be at least 3 characters")?;
        validate_common(self.email.as_deref(), self.operating_hours.as_ref())
    }
}

// PUT /api/locations/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operating_hours: Option<OperatingHours>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl Validate for LocationPatch {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            ensure(not_blank(name), "name cannot be empty")?;
        }
        if let Some(state) = &self.state {
            ensure(state.trim().len() >= 2, "state must be at least 2 characters")?;
        }
        if let Some(zip) = &self.zip_code {
            ensure(zip.trim().len() >= 3, "zip_code must be at least 3 characters")?;
        }
        validate_common(self.email.as_deref(), self.operating_hours.as_ref())
    }
}

fn validate_common(email: Option<&str>, hours: Option<&OperatingHours>) -> Result<(), String> {
    if let Some(email) = email {
        ensure(is_email(email), "email must be a valid email address")?;
    }
    if let Some(hours) = hours {
        hours.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_storage_row() {
        let row = serde_json::json!({
            "id": 1,
            "name": "Hershey Office",
            "address": "24 Northeast Dr",
            "city": "Hershey",
            "state": "PA",
            "zip_code": "17033",
            "phone": null,
            "latitude": null,
            "longitude": null,
            "is_active": 1,
            "operating_hours": "{\"sunday\":{\"closed\":true}}",
            "created_at": "2024-01-01 00:00:00"
        });
        let location: Location = serde_json::from_value(row).unwrap();
        assert!(location.is_active);
        assert!(location.operating_hours.is_some());
        assert_eq!(location.email, None);
    }

    #[test]
    fn test_new_location_requires_address_fields() {
        let body: NewLocation = serde_json::from_value(serde_json::json!({
            "name": "Annex",
            "address": " ",
            "city": "Bethlehem",
            "state": "PA",
            "zip_code": "18018"
        }))
        .unwrap();
        assert_eq!(body.validate().unwrap_err(), "address is required");
    }

    #[test]
    fn test_is_active_accepts_integer() {
        let patch: LocationPatch = serde_json::from_value(serde_json::json!({ "is_active": 0 })).unwrap();
        assert_eq!(patch.is_active, Some(false));
    }
}
