//! Hosted auth backend client.
//!
//! ARCHITECTURE
//! ============
//! Every session operation is delegated to a GoTrue-compatible REST API
//! (`/auth/v1/*`). Handlers and the route guard only see the `AuthBackend`
//! trait; `AppState` carries one explicitly constructed implementation so
//! tests can swap in a mock and no module keeps a hidden global client.
//!
//! TRADE-OFFS
//! ==========
//! `lookup_session` validates the access token remotely on every call
//! instead of verifying the JWT locally. This costs one round trip per
//! guarded request but keeps signing keys out of this service.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BackendConfig;

// =============================================================================
// TYPES
// =============================================================================

/// User record returned by the auth backend. Only the fields this service
/// consumes are modelled; the rest of the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

/// A live session as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Credentials carried by an inbound request's cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// PKCE parameters forwarded on flows that end in an emailed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailLinkOptions {
    /// Absolute URL the emailed link should land on.
    pub redirect_to: String,
    pub code_challenge: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend URL or key is not configured.
    #[error("auth backend not configured: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("auth request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("auth backend returned {status}: {message}")]
    Response { status: u16, message: String },

    /// The backend answered 2xx with a body we could not decode.
    #[error("auth response parse failed: {0}")]
    Parse(String),
}

impl AuthError {
    /// True when the backend understood the request and refused it
    /// (bad credentials, expired token, duplicate account). Everything else
    /// is an infrastructure failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Response { status: 400..=499, .. })
    }

    /// Human-readable message suitable for a JSON error body.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Response { message, .. } => message,
            _ => "Authentication service unavailable",
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the service needs from the auth backend.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve session presence for the given cookie tokens.
    ///
    /// Returns `Ok(None)` when the backend rejects the token and `Err` when
    /// the backend could not be asked.
    async fn lookup_session(&self, tokens: &SessionTokens) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        link: &EmailLinkOptions,
    ) -> Result<(), AuthError>;

    /// Send a password recovery email.
    async fn recover(&self, email: &str, link: &EmailLinkOptions) -> Result<(), AuthError>;

    /// Trade a PKCE auth code for a session.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<AuthSession, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

// =============================================================================
// SUPABASE CLIENT
// =============================================================================

/// `reqwest` implementation of [`AuthBackend`] for a GoTrue endpoint.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    /// Build a client from typed backend config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.url.clone(), anon_key: config.anon_key.clone() })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.endpoint(path)).header("apikey", &self.anon_key)
    }

    fn authed(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {access_token}"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        Ok((status, body))
    }

    async fn send_session(&self, request: RequestBuilder) -> Result<AuthSession, AuthError> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(response_error(status.as_u16(), &body));
        }
        parse_session(&body)
    }

    async fn send_unit(&self, request: RequestBuilder) -> Result<(), AuthError> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(response_error(status.as_u16(), &body));
        }
        Ok(())
    }

    fn redirect_query(link: &EmailLinkOptions) -> String {
        format!("?redirect_to={}", urlencoding::encode(&link.redirect_to))
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseClient {
    async fn lookup_session(&self, tokens: &SessionTokens) -> Result<Option<AuthUser>, AuthError> {
        let request = self.authed(
            self.http.get(self.endpoint("user")).header("apikey", &self.anon_key),
            &tokens.access_token,
        );
        let (status, body) = self.send(request).await?;
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(response_error(status.as_u16(), &body));
        }
        parse_user(&body).map(Some)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .post("token?grant_type=password")
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.send_session(request).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        link: &EmailLinkOptions,
    ) -> Result<(), AuthError> {
        let request = self
            .post(&format!("signup{}", Self::redirect_query(link)))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
                "code_challenge": link.code_challenge,
                "code_challenge_method": "s256",
            }));
        self.send_unit(request).await
    }

    async fn recover(&self, email: &str, link: &EmailLinkOptions) -> Result<(), AuthError> {
        let request = self
            .post(&format!("recover{}", Self::redirect_query(link)))
            .json(&serde_json::json!({
                "email": email,
                "code_challenge": link.code_challenge,
                "code_challenge_method": "s256",
            }));
        self.send_unit(request).await
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .post("token?grant_type=pkce")
            .json(&serde_json::json!({ "auth_code": code, "code_verifier": code_verifier }));
        self.send_session(request).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .post("token?grant_type=refresh_token")
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        self.send_session(request).await
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthError> {
        let request = self.authed(
            self.http
                .put(self.endpoint("user"))
                .header("apikey", &self.anon_key)
                .json(&serde_json::json!({ "password": password })),
            access_token,
        );
        self.send_unit(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let request = self.authed(self.post("logout"), access_token);
        self.send_unit(request).await
    }
}

// =============================================================================
// UNCONFIGURED BACKEND
// =============================================================================

/// Stand-in used when the backend env vars are missing. Every call fails
/// with [`AuthError::Config`], so the guard fails open and API routes answer
/// with a service error instead of the process refusing to start.
pub struct UnconfiguredBackend {
    missing: String,
}

impl UnconfiguredBackend {
    #[must_use]
    pub fn new(missing: &[&str]) -> Self {
        Self { missing: missing.join(", ") }
    }

    fn err(&self) -> AuthError {
        AuthError::Config(format!("missing {}", self.missing))
    }
}

#[async_trait::async_trait]
impl AuthBackend for UnconfiguredBackend {
    async fn lookup_session(&self, _tokens: &SessionTokens) -> Result<Option<AuthUser>, AuthError> {
        Err(self.err())
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<AuthSession, AuthError> {
        Err(self.err())
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _full_name: Option<&str>,
        _link: &EmailLinkOptions,
    ) -> Result<(), AuthError> {
        Err(self.err())
    }

    async fn recover(&self, _email: &str, _link: &EmailLinkOptions) -> Result<(), AuthError> {
        Err(self.err())
    }

    async fn exchange_code(&self, _code: &str, _code_verifier: &str) -> Result<AuthSession, AuthError> {
        Err(self.err())
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<AuthSession, AuthError> {
        Err(self.err())
    }

    async fn update_password(&self, _access_token: &str, _password: &str) -> Result<(), AuthError> {
        Err(self.err())
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Err(self.err())
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_user(body: &str) -> Result<AuthUser, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::Parse(e.to_string()))
}

pub(crate) fn parse_session(body: &str) -> Result<AuthSession, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::Parse(e.to_string()))
}

/// Pull the most specific message out of a backend error body.
///
/// GoTrue is not consistent here: token endpoints answer OAuth-style
/// `error_description`, newer endpoints use `msg` or `message`.
pub(crate) fn parse_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_owned)
}

fn response_error(status: u16, body: &str) -> AuthError {
    let message = parse_error_message(body).unwrap_or_else(|| format!("status {status}"));
    AuthError::Response { status, message }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
