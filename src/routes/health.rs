//! Health check for deployment verification.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub auth: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub version: &'static str,
    pub checks: HealthChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/health` — 200 when configured, 503 naming missing env vars.
pub async fn health(State(state): State<AppState>) -> Response {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let uptime = state.started_at.elapsed().as_secs_f64();
    let missing = &state.config.missing;

    let (status, report) = if missing.is_empty() {
        (
            StatusCode::OK,
            HealthReport {
                status: "healthy",
                timestamp,
                uptime,
                version: env!("CARGO_PKG_VERSION"),
                checks: HealthChecks { auth: "configured" },
                error: None,
            },
        )
    } else {
        tracing::warn!(missing = ?missing, "health check: backend not configured");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthReport {
                status: "unhealthy",
                timestamp,
                uptime,
                version: env!("CARGO_PKG_VERSION"),
                checks: HealthChecks { auth: "missing" },
                error: Some(format!("Missing environment variables: {}", missing.join(", "))),
            },
        )
    };

    (status, Json(report)).into_response()
}
