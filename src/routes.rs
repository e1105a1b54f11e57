use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get, patch, post};
use axum::{middleware, Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers;
use crate::middleware::{error_envelope, REQUEST_ID_HEADER};
use crate::state::AppState;

pub fn build(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/admin/init", any(handlers::admin::init))
        // ── Auth ──
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        // ── Locations ──
        .route(
            "/api/locations",
            get(handlers::locations::list_locations).post(handlers::locations::create_location),
        )
        .route(
            "/api/locations/:id",
            get(handlers::locations::get_location)
                .put(handlers::locations::update_location)
                .delete(handlers::locations::delete_location),
        )
        .route(
            "/api/locations/:id/toggle-active",
            patch(handlers::locations::toggle_active),
        )
        // ── Services ──
        .route(
            "/api/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/api/services/meta/categories",
            get(handlers::services::categories),
        )
        .route(
            "/api/services/:id",
            get(handlers::services::get_service)
                .put(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        // ── Classes ──
        .route(
            "/api/classes",
            get(handlers::classes::list_classes).post(handlers::classes::create_class),
        )
        .route("/api/classes/register", post(handlers::classes::register))
        .route(
            "/api/classes/registrations",
            get(handlers::classes::list_registrations),
        )
        .route(
            "/api/classes/registrations/:id/status",
            patch(handlers::classes::update_registration_status),
        )
        .route(
            "/api/classes/:id",
            get(handlers::classes::get_class)
                .put(handlers::classes::update_class)
                .delete(handlers::classes::delete_class),
        )
        // ── Bookings ──
        .nest("/api/booking", booking_routes())
        .nest("/api/bookings", booking_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), error_envelope))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                    let request_id = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}

fn booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::booking::list_bookings).post(handlers::booking::create_booking),
        )
        .route("/admin", get(handlers::booking::list_bookings))
        .route(
            "/availability/:date",
            get(handlers::booking::availability),
        )
        .route(
            "/:id",
            get(handlers::booking::get_booking).delete(handlers::booking::delete_booking),
        )
        .route(
            "/:id/status",
            patch(handlers::booking::update_status).put(handlers::booking::update_status),
        )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "API endpoint not found" })),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
