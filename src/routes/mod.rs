//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON auth API and the browser-facing auth callback,
//! then serves the pre-rendered site pages as static files. The route guard
//! wraps everything; `/api/*` is exempt from it and authenticates per handler.

pub mod auth;
pub mod health;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::guard::route_guard;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// API + callback routes, without the static site fallback.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/api/auth/reset-password",
            get(auth::reset_password_check)
                .post(auth::reset_password)
                .put(auth::reset_password_session),
        )
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/auth/callback", get(auth::callback))
}

/// Full application router: API, static pages, guard and HTTP layers.
pub fn app(state: AppState) -> Router {
    let site = ServeDir::new(&state.config.site_dir).append_index_html_on_directories(true);

    api_routes()
        .fallback_service(site)
        .layer(from_fn_with_state(state.clone(), route_guard))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// `{ "error": message }` with the given status.
pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a backend failure to the status the browser should see.
pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::HttpClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Request(_) | AuthError::Parse(_) => StatusCode::BAD_GATEWAY,
        AuthError::Response { status: 401 | 403, .. } => StatusCode::UNAUTHORIZED,
        AuthError::Response { status: 400..=499, .. } => StatusCode::BAD_REQUEST,
        AuthError::Response { .. } => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
