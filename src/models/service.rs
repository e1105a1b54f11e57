use serde::{Deserialize, Serialize};

use super::columns::{flag, json_text, optional_flag};
use super::validation::{ensure, not_blank, valid_duration, valid_price, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub service_key: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub duration: i64,
    pub price: f64,
    /// Optional pricing tiers; `durations[i]` is sold at `prices[i]`.
    #[serde(default, with = "json_text")]
    pub durations: Option<Vec<i64>>,
    #[serde(default, with = "json_text")]
    pub prices: Option<Vec<f64>>,
    #[serde(with = "flag")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// POST /api/services
#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub service_key: Option<String>,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub duration: i64,
    pub price: f64,
    pub durations: Option<Vec<i64>>,
    pub prices: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl NewService {
    pub fn key(&self) -> String {
        match &self.service_key {
            Some(key) if not_blank(key) => slugify(key),
            _ => slugify(&self.name),
        }
    }
}

impl Validate for NewService {
    fn validate(&self) -> Result<(), String> {
        ensure(not_blank(&self.name), "name is required")?;
        ensure(not_blank(&self.category), "category is required")?;
        ensure(!self.key().is_empty(), "service_key must contain letters or digits")?;
        ensure(
            valid_duration(self.duration),
            "Duration must be between 15 and 300 minutes",
        )?;
        ensure(valid_price(self.price), "Price must be positive")?;
        validate_tiers(self.durations.as_deref(), self.prices.as_deref())
    }
}

// PUT /api/services/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i64>,
    pub price: Option<f64>,
    pub durations: Option<Vec<i64>>,
    pub prices: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "optional_flag::deserialize")]
    pub is_active: Option<bool>,
}

impl Validate for ServicePatch {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            ensure(not_blank(name), "name cannot be empty")?;
        }
        if let Some(category) = &self.category {
            ensure(not_blank(category), "category cannot be empty")?;
        }
        if let Some(duration) = self.duration {
            ensure(
                valid_duration(duration),
                "Duration must be between 15 and 300 minutes",
            )?;
        }
        if let Some(price) = self.price {
            ensure(valid_price(price), "Price must be positive")?;
        }
        // Tier lists replace each other as a pair
        ensure(
            self.durations.is_some() == self.prices.is_some(),
            "durations and prices must be updated together",
        )?;
        validate_tiers(self.durations.as_deref(), self.prices.as_deref())
    }
}

fn validate_tiers(durations: Option<&[i64]>, prices: Option<&[f64]>) -> Result<(), String> {
    match (durations, prices) {
        (None, None) => Ok(()),
        (Some(d), Some(p)) => {
            ensure(!d.is_empty(), "durations cannot be empty")?;
            ensure(d.len() == p.len(), "durations and prices must have the same length")?;
            ensure(
                d.iter().all(|m| valid_duration(*m)),
                "every duration must be between 15 and 300 minutes",
            )?;
            ensure(p.iter().all(|v| valid_price(*v)), "every price must be non-negative")
        }
        _ => Err("durations and prices must be supplied together".to_string()),
    }
}

/// `"Deep Tissue Massage"` → `"deep-tissue-massage"`.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_service(json: serde_json::Value) -> NewService {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Deep Tissue Massage"), "deep-tissue-massage");
        assert_eq!(slugify("  Hot-Stone & Cupping! "), "hot-stone-cupping");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_key_prefers_explicit_value() {
        let svc = new_service(serde_json::json!({
            "service_key": "Swedish",
            "name": "Swedish Massage",
            "category": "relaxation",
            "duration": 60,
            "price": 90.0
        }));
        assert_eq!(svc.key(), "swedish");
        assert!(svc.validate().is_ok());
    }

    #[test]
    fn test_tier_lists_must_match() {
        let svc = new_service(serde_json::json!({
            "name": "Prenatal",
            "category": "specialty",
            "duration": 60,
            "price": 95.0,
            "durations": [45, 60, 75],
            "prices": [75.0, 95.0]
        }));
        assert_eq!(
            svc.validate().unwrap_err(),
            "durations and prices must have the same length"
        );
    }

    #[test]
    fn test_duration_bounds() {
        let svc = new_service(serde_json::json!({
            "name": "Quick",
            "category": "relaxation",
            "duration": 10,
            "price": 20.0
        }));
        assert!(svc.validate().is_err());
    }

    #[test]
    fn test_decode_row_with_encoded_tiers() {
        let row = serde_json::json!({
            "id": 2,
            "service_key": "deep-tissue",
            "name": "Deep Tissue Massage",
            "category": "therapeutic",
            "description": null,
            "duration": 60,
            "price": 100.0,
            "durations": "[30,60,90]",
            "prices": "[60,100,140]",
            "is_active": 1
        });
        let svc: Service = serde_json::from_value(row).unwrap();
        assert_eq!(svc.durations, Some(vec![30, 60, 90]));
        assert_eq!(svc.prices, Some(vec![60.0, 100.0, 140.0]));
    }
}
