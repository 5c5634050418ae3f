//! Auth routes — password login, signup, recovery, callback, logout.
//!
//! Every handler that sets or clears session cookies goes through
//! [`crate::cookies::relay`]; none of them builds a `Set-Cookie` by hand.

use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{auth_error_to_status, json_error};
use crate::cookies::relay;
use crate::services::auth::{AuthError, AuthUser, EmailLinkOptions, SessionTokens};
use crate::services::pkce;
use crate::services::validation::{ForgotPasswordForm, LoginForm, ResetPasswordForm, SignupForm};
use crate::state::AppState;

const CALLBACK_PATH: &str = "/auth/callback";
const RESET_PASSWORD_PAGE: &str = "/auth/reset-password";
const CALLBACK_FAILURE: &str = "/login?error=auth-callback-error";
const DUPLICATE_ACCOUNT: &str = "An account with this email already exists. Please sign in instead.";
const RECOVERY_SENT: &str = "If an account exists with this email, you will receive a password reset link.";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Signed-in user, verified against the backend.
///
/// This is the page-level check that backs up the route guard: unlike the
/// guard it fails closed, so a lookup error never yields protected data.
pub struct RequireSession {
    pub user: AuthUser,
    pub tokens: SessionTokens,
}

impl<S> FromRequestParts<S> for RequireSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(tokens) = app_state.cookies.read_tokens(&jar) else {
            return Err(json_error(StatusCode::UNAUTHORIZED, "Unauthorized"));
        };

        match app_state.auth.lookup_session(&tokens).await {
            Ok(Some(user)) => Ok(Self { user, tokens }),
            Ok(None) => Err(json_error(StatusCode::UNAUTHORIZED, "Unauthorized")),
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                Err(json_error(auth_error_to_status(&e), e.public_message()))
            }
        }
    }
}

fn backend_failure(e: &AuthError, action: &'static str) -> Response {
    tracing::error!(error = %e, action, "auth backend call failed");
    json_error(auth_error_to_status(e), e.public_message())
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login` — password sign-in; sets session cookies.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(form): Json<LoginForm>) -> Response {
    let creds = match form.validate() {
        Ok(creds) => creds,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let session = match state.auth.sign_in_with_password(&creds.email, &creds.password).await {
        Ok(session) => session,
        Err(e) if e.is_rejection() => return json_error(StatusCode::UNAUTHORIZED, e.public_message()),
        Err(e) => return backend_failure(&e, "sign_in"),
    };

    let redirect_to = state
        .config
        .routes
        .post_login_destination(form.redirect_to.as_deref());
    tracing::info!(user_id = %session.user.id, expires_in = ?session.expires_in, "signed in");

    let jar = relay(jar, state.cookies.session_directives(&session), &state.cookie_policy);
    (jar, Json(serde_json::json!({ "success": true, "redirectTo": redirect_to }))).into_response()
}

/// `POST /api/auth/signup` — create an account; the confirmation link
/// returns through `/auth/callback`.
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Json(form): Json<SignupForm>) -> Response {
    let (creds, full_name) = match form.validate() {
        Ok(validated) => validated,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let verifier = pkce::generate_code_verifier();
    let link = EmailLinkOptions {
        redirect_to: format!("{}{CALLBACK_PATH}", state.config.app_url),
        code_challenge: pkce::code_challenge(&verifier),
    };

    match state
        .auth
        .sign_up(&creds.email, &creds.password, full_name.as_deref(), &link)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_rejection() && is_duplicate_account(&e) => {
            return json_error(StatusCode::CONFLICT, DUPLICATE_ACCOUNT);
        }
        Err(e) if e.is_rejection() => return json_error(StatusCode::BAD_REQUEST, e.public_message()),
        Err(e) => return backend_failure(&e, "sign_up"),
    }

    let jar = relay(jar, [state.cookies.verifier_directive(&verifier)], &state.cookie_policy);
    let body = serde_json::json!({
        "success": true,
        "message": "Please check your email to verify your account.",
    });
    (jar, Json(body)).into_response()
}

fn is_duplicate_account(e: &AuthError) -> bool {
    e.public_message().to_ascii_lowercase().contains("already registered")
}

/// `POST /api/auth/forgot-password` — send a recovery link. Answers the same
/// way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<ForgotPasswordForm>,
) -> Response {
    let email = match form.validate() {
        Ok(email) => email,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let verifier = pkce::generate_code_verifier();
    let link = EmailLinkOptions {
        redirect_to: format!(
            "{}{CALLBACK_PATH}?next={}",
            state.config.app_url,
            urlencoding::encode(RESET_PASSWORD_PAGE)
        ),
        code_challenge: pkce::code_challenge(&verifier),
    };

    match state.auth.recover(&email, &link).await {
        Ok(()) => {}
        Err(e) if e.is_rejection() => tracing::debug!(error = %e, "recovery request rejected"),
        Err(e) => return backend_failure(&e, "recover"),
    }

    let jar = relay(jar, [state.cookies.verifier_directive(&verifier)], &state.cookie_policy);
    (jar, Json(serde_json::json!({ "success": true, "message": RECOVERY_SENT }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    next: Option<String>,
}

/// `GET /auth/callback` — exchange the emailed code for a session, then
/// redirect to `next` (same-origin only) or the dashboard.
pub async fn callback(State(state): State<AppState>, jar: CookieJar, Query(params): Query<CallbackQuery>) -> Response {
    let clear_verifier = state.cookies.clear_verifier_directive();
    let verifier = state.cookies.code_verifier(&jar);

    let (Some(code), Some(verifier)) = (params.code.as_deref().filter(|c| !c.is_empty()), verifier) else {
        tracing::warn!("auth callback without code or verifier");
        let jar = relay(jar, [clear_verifier], &state.cookie_policy);
        return (jar, Redirect::temporary(CALLBACK_FAILURE)).into_response();
    };

    match state.auth.exchange_code(code, &verifier).await {
        Ok(session) => {
            let next = state.config.routes.post_login_destination(params.next.as_deref());
            tracing::info!(user_id = %session.user.id, %next, "auth callback completed");
            let mut directives = state.cookies.session_directives(&session);
            directives.push(clear_verifier);
            let jar = relay(jar, directives, &state.cookie_policy);
            (jar, Redirect::temporary(&next)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "auth code exchange failed");
            let jar = relay(jar, [clear_verifier], &state.cookie_policy);
            (jar, Redirect::temporary(CALLBACK_FAILURE)).into_response()
        }
    }
}

/// `GET /api/auth/reset-password` — is there a session to reset with?
pub async fn reset_password_check(_session: RequireSession) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "hasSession": true }))
}

#[derive(Debug, Deserialize)]
pub struct RecoveryTokens {
    #[serde(default)]
    access_token: String,
    refresh_token: Option<String>,
}

/// `PUT /api/auth/reset-password` — adopt recovery tokens handed over by the
/// reset page as the cookie session.
pub async fn reset_password_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RecoveryTokens>,
) -> Response {
    if body.access_token.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Missing access token");
    }
    let tokens = SessionTokens {
        access_token: body.access_token,
        refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
    };

    let directives = match state.auth.lookup_session(&tokens).await {
        Ok(Some(_)) => state
            .cookies
            .token_directives(&tokens.access_token, tokens.refresh_token.as_deref()),
        Ok(None) => {
            let Some(refresh_token) = tokens.refresh_token.as_deref() else {
                return json_error(StatusCode::UNAUTHORIZED, "Invalid or expired reset token");
            };
            match state.auth.refresh_session(refresh_token).await {
                Ok(session) => state.cookies.session_directives(&session),
                Err(e) if e.is_rejection() => {
                    return json_error(StatusCode::UNAUTHORIZED, "Invalid or expired reset token");
                }
                Err(e) => return backend_failure(&e, "refresh_session"),
            }
        }
        Err(e) => return backend_failure(&e, "lookup_session"),
    };

    let jar = relay(jar, directives, &state.cookie_policy);
    (jar, Json(serde_json::json!({ "success": true, "message": "Session established" }))).into_response()
}

/// `POST /api/auth/reset-password` — set a new password, then end the
/// session so the user signs in with it.
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    session: RequireSession,
    Json(form): Json<ResetPasswordForm>,
) -> Response {
    let password = match form.validate() {
        Ok(password) => password,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state
        .auth
        .update_password(&session.tokens.access_token, password)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_rejection() => return json_error(StatusCode::BAD_REQUEST, e.public_message()),
        Err(e) => return backend_failure(&e, "update_password"),
    }

    if let Err(e) = state.auth.sign_out(&session.tokens.access_token).await {
        tracing::warn!(error = %e, "sign-out after password reset failed");
    }
    tracing::info!(user_id = %session.user.id, "password reset");

    let jar = relay(jar, state.cookies.clear_directives(), &state.cookie_policy);
    let body = serde_json::json!({ "success": true, "message": "Password reset successfully" });
    (jar, Json(body)).into_response()
}

/// `POST /api/auth/refresh` — trade the refresh-token cookie for a new
/// session. A rejected refresh token clears the stale cookies.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(refresh_token) = state.cookies.refresh_token(&jar) else {
        return json_error(StatusCode::UNAUTHORIZED, "No session to refresh");
    };

    match state.auth.refresh_session(&refresh_token).await {
        Ok(session) => {
            let jar = relay(jar, state.cookies.session_directives(&session), &state.cookie_policy);
            (jar, Json(serde_json::json!({ "success": true }))).into_response()
        }
        Err(e) if e.is_rejection() => {
            let jar = relay(jar, state.cookies.clear_directives(), &state.cookie_policy);
            (jar, json_error(StatusCode::UNAUTHORIZED, e.public_message())).into_response()
        }
        Err(e) => backend_failure(&e, "refresh_session"),
    }
}

/// `GET /api/auth/me` — return current user.
pub async fn me(session: RequireSession) -> Json<AuthUser> {
    Json(session.user)
}

/// `POST /api/auth/logout` — best-effort backend sign-out, then clear cookies.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(tokens) = state.cookies.read_tokens(&jar) {
        if let Err(e) = state.auth.sign_out(&tokens.access_token).await {
            tracing::warn!(error = %e, "backend sign-out failed; clearing cookies anyway");
        }
    }

    let jar = relay(jar, state.cookies.clear_directives(), &state.cookie_policy);
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
