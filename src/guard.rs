//! Route guard — session gating in front of page rendering.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs as Axum middleware before every route. It classifies the request
//! path, resolves session presence with one backend lookup, and either
//! forwards the request untouched or answers with a redirect:
//!
//! - protected page without a session -> `/login?redirect=<path>`
//! - auth page with a session -> the validated `redirect` target or `/dashboard`
//!
//! The guard is a fast path, not the only enforcement point. A failed lookup
//! lets the request through; API handlers and the `RequireSession` extractor
//! verify the session again before returning protected data. The guard never
//! writes cookies or session state.

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::services::auth::AuthError;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_DESTINATION: &str = "/dashboard";
const REDIRECT_PARAM: &str = "redirect";

// =============================================================================
// ROUTE TABLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Static assets and self-authenticating API paths.
    Exempt,
    /// Pages that establish a session (login, signup, forgot-password).
    Auth,
    /// Pages that only render for a signed-in visitor.
    Protected,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPresence {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    /// Redirect to a same-origin target (path plus optional query).
    Redirect(String),
}

/// Inputs the decision depends on, borrowed from the inbound request.
#[derive(Debug, Clone, Copy)]
pub struct GuardRequest<'a> {
    pub path: &'a str,
    pub redirect: Option<&'a str>,
}

/// Path sets consumed by the guard. Changing the product's route layout
/// means changing this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub asset_prefixes: Vec<String>,
    pub exempt_api_prefixes: Vec<String>,
    pub auth_routes: Vec<String>,
    pub protected_routes: Vec<String>,
    pub login_path: String,
    pub default_destination: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            asset_prefixes: strings(&["/pkg", "/assets"]),
            exempt_api_prefixes: strings(&["/api/"]),
            auth_routes: strings(&["/login", "/signup", "/forgot-password"]),
            protected_routes: strings(&["/dashboard", "/profile", "/settings", "/courses", "/resources"]),
            login_path: LOGIN_PATH.to_owned(),
            default_destination: DEFAULT_DESTINATION.to_owned(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// `path` is `route` itself or one of its `/`-separated sub-paths.
fn matches_route(path: &str, route: &str) -> bool {
    path == route
        || path
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl RouteTable {
    /// Ordered classification, first match wins.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        let exempt = self.asset_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || self.exempt_api_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || path.contains('.');
        if exempt {
            return RouteClass::Exempt;
        }
        if self.is_auth_route(path) {
            return RouteClass::Auth;
        }
        if self.protected_routes.iter().any(|r| matches_route(path, r)) {
            return RouteClass::Protected;
        }
        RouteClass::Public
    }

    #[must_use]
    pub fn is_auth_route(&self, path: &str) -> bool {
        self.auth_routes.iter().any(|r| matches_route(path, r))
    }

    /// Where a signed-in visitor should land. Falls back to the default
    /// destination for anything that is not a same-origin path, and for
    /// targets that are themselves auth pages (they would bounce again).
    #[must_use]
    pub fn post_login_destination(&self, redirect: Option<&str>) -> String {
        match redirect {
            Some(target) if is_same_origin_path(target) && !self.is_auth_route(path_part(target)) => {
                target.to_owned()
            }
            _ => self.default_destination.clone(),
        }
    }

    /// Combine classification and session presence into a decision.
    #[must_use]
    pub fn decide(&self, request: &GuardRequest<'_>, presence: SessionPresence) -> Decision {
        let path = request.path;
        match (self.classify(path), presence) {
            (RouteClass::Auth, SessionPresence::Present) => {
                // Already at the requested target, even when it is an auth page.
                if request
                    .redirect
                    .is_some_and(|target| is_same_origin_path(target) && path_part(target) == path)
                {
                    return Decision::PassThrough;
                }
                let destination = self.post_login_destination(request.redirect);
                if path == path_part(&destination) || path == self.default_destination {
                    return Decision::PassThrough;
                }
                Decision::Redirect(strip_query_param(&destination, REDIRECT_PARAM))
            }
            (RouteClass::Protected, SessionPresence::Absent) => {
                if path == self.login_path {
                    return Decision::PassThrough;
                }
                Decision::Redirect(format!(
                    "{}?{REDIRECT_PARAM}={}",
                    self.login_path,
                    urlencoding::encode(path)
                ))
            }
            _ => Decision::PassThrough,
        }
    }
}

// =============================================================================
// REDIRECT TARGET HELPERS
// =============================================================================

/// Same-origin absolute path. `//host` and `/\host` are rejected because
/// browsers resolve them against another origin. Targets must also be
/// printable ASCII so they are valid `Location` header values.
#[must_use]
pub fn is_same_origin_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && target.bytes().all(|b| b.is_ascii_graphic())
}

/// Path component of a same-origin target (before `?` or `#`).
fn path_part(target: &str) -> &str {
    target
        .split_once(['?', '#'])
        .map_or(target, |(path, _)| path)
}

/// Remove every `key=...` pair from the query of `target`, keeping the
/// other pairs and any fragment as they were.
pub(crate) fn strip_query_param(target: &str, key: &str) -> String {
    let (rest, fragment) = match target.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (target, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut out = path.to_owned();
    if let Some(query) = query {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let name = pair.split_once('=').map_or(*pair, |(name, _)| name);
                urlencoding::decode(name).map_or(true, |decoded| decoded != key)
            })
            .collect();
        if !kept.is_empty() {
            out.push('?');
            out.push_str(&kept.join("&"));
        }
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RedirectQuery {
    redirect: Option<String>,
}

/// Axum middleware entry point (`from_fn_with_state`).
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let routes = &state.config.routes;
    let path = request.uri().path().to_owned();

    if routes.classify(&path) == RouteClass::Exempt {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let presence = match resolve_presence(&state, &jar).await {
        Ok(presence) => presence,
        Err(e) => {
            tracing::error!(%path, error = %e, "session lookup failed; passing request through");
            return next.run(request).await;
        }
    };

    // A malformed query (e.g. duplicate keys) counts as no redirect target.
    let query = Query::<RedirectQuery>::try_from_uri(request.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();
    let guard_request = GuardRequest { path: &path, redirect: query.redirect.as_deref() };

    match routes.decide(&guard_request, presence) {
        Decision::PassThrough => {
            tracing::debug!(%path, ?presence, "guard pass");
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(%path, ?presence, %target, "guard redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

async fn resolve_presence(state: &AppState, jar: &CookieJar) -> Result<SessionPresence, AuthError> {
    let Some(tokens) = state.cookies.read_tokens(jar) else {
        return Ok(SessionPresence::Absent);
    };
    let user = state.auth.lookup_session(&tokens).await?;
    Ok(if user.is_some() { SessionPresence::Present } else { SessionPresence::Absent })
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
