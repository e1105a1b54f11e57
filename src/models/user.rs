use serde::{Deserialize, Serialize};

use super::validation::{ensure, is_email, not_blank, Validate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

// POST /api/auth/login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        ensure(is_email(&self.email), "email must be a valid email address")?;
        ensure(
            (6..=100).contains(&self.password.chars().count()),
            "password must be between 6 and 100 characters",
        )
    }
}

// POST /api/auth/register
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub admin_key: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        ensure(is_email(&self.email), "email must be a valid email address")?;
        ensure(
            (8..=100).contains(&self.password.chars().count()),
            "password must be between 8 and 100 characters",
        )?;
        ensure(not_blank(&self.first_name), "firstName is required")?;
        ensure(not_blank(&self.last_name), "lastName is required")?;
        ensure(not_blank(&self.admin_key), "adminKey is required")
    }
}

// POST /api/auth/change-password
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), String> {
        ensure(
            self.current_password.chars().count() >= 6,
            "currentPassword must be at least 6 characters",
        )?;
        ensure(
            (8..=100).contains(&self.new_password.chars().count()),
            "newPassword must be between 8 and 100 characters",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 1,
            "email": "admin@example.com",
            "password_hash": "$2b$04$abc",
            "first_name": "Admin",
            "last_name": "User",
            "role": "admin"
        }))
        .unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "admin@example.com");
    }

    #[test]
    fn test_register_uses_camel_case() {
        let body: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "new@example.com",
            "password": "longenough",
            "firstName": "New",
            "lastName": "Admin",
            "adminKey": "registration-key"
        }))
        .unwrap();
        assert!(body.validate().is_ok());
    }
}
