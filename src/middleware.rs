use std::net::SocketAddr;
use std::sync::Arc;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::{AppError, ErrorDetail};
use crate::models::Validate;
use crate::services::auth::{self, Claims};
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_ERROR_BODY: usize = 64 * 1024;

// ── Auth extractors ──

/// Any holder of a valid token.
pub struct AuthUser(pub Claims);

/// A valid token whose role is `admin`.
pub struct AdminUser(pub Claims);

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .map(str::to_string)
        .find(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let claims = auth::verify_token(&state.config.jwt_secret, &token)?;
        Ok(AuthUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(claims))
    }
}

/// Key for per-client login throttling. Behind a trusted proxy this is the
/// first `x-forwarded-for` hop; otherwise the socket peer. `None` when neither
/// is known, in which case only the email key applies.
pub fn client_ip_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .map(|ip| format!("ip:{ip}"))
}

// ── Validated JSON ──

/// `Json<T>` that also runs `T::validate`; both failures are 400s.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        value.validate().map_err(AppError::Validation)?;
        Ok(JsonBody(value))
    }
}

// ── Error envelope ──

/// Rewrites every 4xx/5xx body into `{"message", "requestId"}` JSON, adding the
/// internal detail only in development.
pub async fn error_envelope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let detail = response.extensions().get::<ErrorDetail>().cloned();
    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            %method,
            path = %path,
            status = status.as_u16(),
            error = detail.as_ref().map(|d| d.0.as_str()).unwrap_or("-"),
            "request failed"
        );
    } else {
        tracing::debug!(request_id = %request_id, %method, path = %path, status = status.as_u16(), "request rejected");
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "failed to read error body");
            Default::default()
        }
    };

    let mut value = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("Error").to_string()
            } else {
                text
            };
            json!({ "message": message })
        });

    if let Some(body) = value.as_object_mut() {
        body.insert("requestId".to_string(), Value::String(request_id));
        if let (true, Some(detail)) = (state.config.is_development(), detail) {
            body.insert("error".to_string(), Value::String(detail.0));
        }
    }

    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = serde_json::to_vec(&value).unwrap_or_default();
    Response::from_parts(parts, Body::from(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
        assert_eq!(cookie_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_client_ip_key() {
        let peer: SocketAddr = "198.51.100.7:53211".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip_key(&headers, None, false), None);
        assert_eq!(
            client_ip_key(&headers, Some(peer), false).as_deref(),
            Some("ip:198.51.100.7")
        );

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        // Forwarded header is ignored unless the proxy is trusted
        assert_eq!(
            client_ip_key(&headers, Some(peer), false).as_deref(),
            Some("ip:198.51.100.7")
        );
        assert_eq!(client_ip_key(&headers, None, false), None);
        assert_eq!(
            client_ip_key(&headers, Some(peer), true).as_deref(),
            Some("ip:203.0.113.9")
        );
    }
}
