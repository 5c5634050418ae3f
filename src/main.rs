mod config;
mod cookies;
mod guard;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::auth::{AuthBackend, SupabaseClient, UnconfiguredBackend};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    // Non-fatal: the guard fails open and /api/health reports unhealthy.
    let auth: Arc<dyn AuthBackend> = match config.backend.as_ref() {
        Some(backend) => {
            let client = SupabaseClient::new(backend).expect("auth http client init failed");
            tracing::info!(url = %backend.url, "auth backend configured");
            Arc::new(client)
        }
        None => {
            tracing::warn!(missing = ?config.missing, "auth backend not configured; sessions cannot be verified");
            Arc::new(UnconfiguredBackend::new(&config.missing))
        }
    };

    let state = state::AppState::new(config, auth);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "academy portal listening");
    axum::serve(listener, app).await.expect("server failed");
}
