use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::User;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

pub fn issue_token(secret: &str, user: &User) -> Result<String, TokenError> {
    issue_token_at(secret, user.id, &user.email, &user.role, Utc::now())
}

/// Signs a fresh HS256 token for the same subject.
pub fn reissue_token(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    issue_token_at(secret, claims.user_id, &claims.email, &claims.role, Utc::now())
}

pub fn issue_token_at(
    secret: &str,
    user_id: i64,
    email: &str,
    role: &str,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = Claims {
        user_id,
        email: email.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

// ── Passwords ──

/// bcrypt is CPU bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_owned();
    let hash = hash.to_owned();

    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let token = issue_token_at(SECRET, 7, "admin@example.com", "admin", Utc::now()).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "admin@example.com");
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 2);
        let token = issue_token_at(SECRET, 7, "admin@example.com", "admin", issued).unwrap();
        assert!(matches!(verify_token(SECRET, &token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issue_token_at(SECRET, 7, "admin@example.com", "admin", Utc::now()).unwrap();
        assert!(matches!(verify_token("other", &token), Err(TokenError::Invalid)));
        assert!(matches!(verify_token(SECRET, "not-a-jwt"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_claims_use_camel_case() {
        let token = issue_token_at(SECRET, 3, "a@example.com", "admin", Utc::now()).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 3);
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("correct horse", 4).await.unwrap();
        assert!(verify_password("correct horse", &hash).await);
        assert!(!verify_password("battery staple", &hash).await);
        assert!(!verify_password("anything", "not-a-hash").await);
    }
}
