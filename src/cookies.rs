//! Session cookie relay.
//!
//! CONTRACT
//! ========
//! Every handler that touches session cookies goes through this module:
//! read all inbound cookies from the request jar, forward every cookie
//! directive issued by the auth layer verbatim, and override only the
//! attributes the product requires. Attribute precedence is fixed:
//!
//! 1. an attribute set on the directive wins,
//! 2. a missing attribute is filled from [`CookiePolicy`],
//! 3. `Secure` is forced on whenever the policy requires it.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::services::auth::{AuthSession, SessionTokens};

/// Product default lifetime for session cookies.
pub const DEFAULT_MAX_AGE: Duration = Duration::days(7);
/// The PKCE verifier only has to survive until the emailed link is clicked.
pub const CODE_VERIFIER_MAX_AGE: Duration = Duration::hours(1);
/// Only the auth callback reads the verifier.
pub const CODE_VERIFIER_PATH: &str = "/auth/callback";

/// Cookie attributes as issued. `None` means "not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
    pub secure: Option<bool>,
    pub path: Option<String>,
    pub max_age: Option<Duration>,
}

/// One cookie to set (or clear) on the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl CookieDirective {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), options: CookieOptions::default() }
    }

    /// A directive that expires the named cookie immediately.
    #[must_use]
    pub fn removal(name: impl Into<String>) -> Self {
        let mut directive = Self::new(name, "");
        directive.options.max_age = Some(Duration::ZERO);
        directive
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.options.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.options.max_age = Some(max_age);
        self
    }
}

/// Attributes the product imposes on every relayed cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub force_secure: bool,
    pub default_max_age: Duration,
}

impl CookiePolicy {
    #[must_use]
    pub fn new(force_secure: bool) -> Self {
        Self { force_secure, default_max_age: DEFAULT_MAX_AGE }
    }

    /// Resolve a directive into a concrete cookie.
    #[must_use]
    pub fn finalize(&self, directive: CookieDirective) -> Cookie<'static> {
        let CookieDirective { name, value, options } = directive;
        Cookie::build((name, value))
            .http_only(options.http_only.unwrap_or(true))
            .same_site(options.same_site.unwrap_or(SameSite::Lax))
            .secure(self.force_secure || options.secure.unwrap_or(false))
            .path(options.path.unwrap_or_else(|| "/".to_owned()))
            .max_age(options.max_age.unwrap_or(self.default_max_age))
            .build()
    }
}

/// Add every directive to the outgoing jar under `policy`.
#[must_use]
pub fn relay(
    jar: CookieJar,
    directives: impl IntoIterator<Item = CookieDirective>,
    policy: &CookiePolicy,
) -> CookieJar {
    directives
        .into_iter()
        .fold(jar, |jar, directive| jar.add(policy.finalize(directive)))
}

/// Names of the cookies that carry session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    access: String,
    refresh: String,
    verifier: String,
}

impl SessionCookies {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            access: format!("{prefix}-access-token"),
            refresh: format!("{prefix}-refresh-token"),
            verifier: format!("{prefix}-code-verifier"),
        }
    }

    /// Session tokens from the inbound jar. `None` without an access token.
    #[must_use]
    pub fn read_tokens(&self, jar: &CookieJar) -> Option<SessionTokens> {
        let access_token = non_empty(jar, &self.access)?;
        Some(SessionTokens { access_token, refresh_token: non_empty(jar, &self.refresh) })
    }

    /// Refresh token alone; used when the access token has already expired.
    #[must_use]
    pub fn refresh_token(&self, jar: &CookieJar) -> Option<String> {
        non_empty(jar, &self.refresh)
    }

    #[must_use]
    pub fn code_verifier(&self, jar: &CookieJar) -> Option<String> {
        non_empty(jar, &self.verifier)
    }

    /// Directives persisting a freshly issued session.
    #[must_use]
    pub fn session_directives(&self, session: &AuthSession) -> Vec<CookieDirective> {
        self.token_directives(&session.access_token, Some(&session.refresh_token))
    }

    /// Directives persisting raw tokens handed over by the browser.
    #[must_use]
    pub fn token_directives(&self, access_token: &str, refresh_token: Option<&str>) -> Vec<CookieDirective> {
        let mut directives = vec![CookieDirective::new(self.access.clone(), access_token)];
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            directives.push(CookieDirective::new(self.refresh.clone(), refresh_token));
        }
        directives
    }

    /// Directives expiring both session cookies.
    #[must_use]
    pub fn clear_directives(&self) -> Vec<CookieDirective> {
        vec![CookieDirective::removal(self.access.clone()), CookieDirective::removal(self.refresh.clone())]
    }

    #[must_use]
    pub fn verifier_directive(&self, verifier: &str) -> CookieDirective {
        CookieDirective::new(self.verifier.clone(), verifier)
            .path(CODE_VERIFIER_PATH)
            .max_age(CODE_VERIFIER_MAX_AGE)
    }

    #[must_use]
    pub fn clear_verifier_directive(&self) -> CookieDirective {
        CookieDirective::removal(self.verifier.clone()).path(CODE_VERIFIER_PATH)
    }
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
