use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::db::storage::StorageError;
use crate::services::auth::TokenError;
use crate::services::scheduling::SchedulingError;

/// Internal failure text carried on 500 responses for the error envelope.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("database error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::SlotTaken | SchedulingError::ClassFull => {
                AppError::Conflict(e.to_string())
            }
            SchedulingError::NotFound(_) => AppError::NotFound(e.to_string()),
            SchedulingError::Rejected(msg) => AppError::Validation(msg),
            SchedulingError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::Unauthorized(e.to_string()),
            TokenError::Invalid => AppError::Forbidden(e.to_string()),
            TokenError::Signing(_) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Storage(e) if e.is_unique_violation() => {
                (StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            AppError::Storage(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let mut response = (status, axum::Json(serde_json::json!({ "message": message }))).into_response();
        if status.is_server_error() || matches!(self, AppError::Storage(_)) {
            response.extensions_mut().insert(ErrorDetail(self.to_string()));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::storage::{Backend, StorageErrorKind};

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = AppError::Storage(StorageError {
            backend: Backend::Postgres,
            kind: StorageErrorKind::UniqueViolation,
            code: Some("23505".into()),
            message: "duplicate key".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_detail_kept_off_body() {
        let response = AppError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert!(detail.0.contains("disk on fire"));
    }

    #[test]
    fn test_scheduling_errors() {
        let status = |e: SchedulingError| AppError::from(e).into_response().status();
        assert_eq!(status(SchedulingError::SlotTaken), StatusCode::CONFLICT);
        assert_eq!(status(SchedulingError::ClassFull), StatusCode::CONFLICT);
        assert_eq!(status(SchedulingError::NotFound("Class")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(SchedulingError::Rejected("nope".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
