use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use crate::db::queries;
use crate::errors::AppError;
use crate::middleware::{client_ip_key, AuthUser, JsonBody};
use crate::models::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::services::auth;
use crate::state::AppState;

// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let mut keys = vec![format!("email:{}", body.email.to_lowercase())];
    keys.extend(client_ip_key(&headers, peer, state.config.trust_proxy));
    let throttle = &state.login_throttle;

    for key in &keys {
        if throttle.is_locked(key).await {
            return Err(AppError::RateLimited(
                "Too many failed attempts. Try again later.".to_string(),
            ));
        }
    }

    let user = match queries::get_user_by_email(state.db.as_ref(), &body.email).await? {
        Some(user) if auth::verify_password(&body.password, &user.password_hash).await => user,
        _ => {
            for key in &keys {
                throttle.record_failure(key).await;
            }
            tracing::info!(key = %keys[0], "failed login");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    for key in &keys {
        throttle.reset(key).await;
    }

    let token = auth::issue_token(&state.config.jwt_secret, &user)?;
    tracing::info!(user_id = user.id, "login");
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let key_matches = state
        .config
        .admin_registration_key
        .as_deref()
        .map(|key| key == body.admin_key)
        .unwrap_or(false);
    if !key_matches {
        return Err(AppError::Forbidden("Invalid admin registration key".to_string()));
    }

    let db = state.db.as_ref();
    if queries::get_user_by_email(db, &body.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hash = auth::hash_password(&body.password, state.config.bcrypt_cost).await?;
    let user = queries::create_user(
        db,
        &body.email,
        &hash,
        body.first_name.trim(),
        body.last_name.trim(),
        "admin",
    )
    .await?;
    let token = auth::issue_token(&state.config.jwt_secret, &user)?;

    tracing::info!(user_id = user.id, "admin user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Admin user created successfully",
            "token": token,
            "user": user,
        })),
    ))
}

// GET /api/auth/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Value>, AppError> {
    let user = queries::get_user(state.db.as_ref(), claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(Json(json!({ "valid": true, "user": user })))
}

// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Value>, AppError> {
    let token = auth::reissue_token(&state.config.jwt_secret, &claims)?;
    Ok(Json(json!({
        "message": "Token refreshed successfully",
        "token": token,
    })))
}

// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.as_ref();
    let user = queries::get_user(db, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !auth::verify_password(&body.current_password, &user.password_hash).await {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }

    let hash = auth::hash_password(&body.new_password, state.config.bcrypt_cost).await?;
    queries::update_password(db, user.id, &hash).await?;

    tracing::info!(user_id = user.id, "password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
