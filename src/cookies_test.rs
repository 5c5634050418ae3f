use super::*;
use crate::services::auth::AuthUser;
use axum::http::{HeaderMap, HeaderValue, header};
use uuid::Uuid;

fn jar_with(cookie_header: &str) -> CookieJar {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
    CookieJar::from_headers(&headers)
}

fn session() -> AuthSession {
    AuthSession {
        access_token: "at-1".into(),
        refresh_token: "rt-1".into(),
        expires_in: Some(3600),
        user: AuthUser { id: Uuid::nil(), email: Some("ada@example.com".into()), email_confirmed_at: None },
    }
}

// =============================================================================
// CookiePolicy::finalize
// =============================================================================

#[test]
fn finalize_fills_product_defaults() {
    let cookie = CookiePolicy::new(false).finalize(CookieDirective::new("a", "1"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.secure(), Some(false));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), Some(DEFAULT_MAX_AGE));
}

#[test]
fn finalize_keeps_issued_attributes() {
    let directive = CookieDirective {
        name: "a".into(),
        value: "1".into(),
        options: CookieOptions {
            http_only: Some(false),
            same_site: Some(SameSite::Strict),
            secure: Some(true),
            path: Some("/auth".into()),
            max_age: Some(Duration::minutes(5)),
        },
    };
    let cookie = CookiePolicy::new(false).finalize(directive);
    assert_eq!(cookie.http_only(), Some(false));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.path(), Some("/auth"));
    assert_eq!(cookie.max_age(), Some(Duration::minutes(5)));
}

#[test]
fn finalize_forces_secure_over_issued_false() {
    let mut directive = CookieDirective::new("a", "1");
    directive.options.secure = Some(false);
    let cookie = CookiePolicy::new(true).finalize(directive);
    assert_eq!(cookie.secure(), Some(true));
}

#[test]
fn removal_expires_immediately() {
    let cookie = CookiePolicy::new(false).finalize(CookieDirective::removal("a"));
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

// =============================================================================
// relay
// =============================================================================

#[test]
fn relay_adds_every_directive() {
    let names = SessionCookies::new("sb");
    let jar = relay(CookieJar::new(), names.session_directives(&session()), &CookiePolicy::new(false));
    assert_eq!(jar.get("sb-access-token").map(Cookie::value), Some("at-1"));
    assert_eq!(jar.get("sb-refresh-token").map(Cookie::value), Some("rt-1"));
}

#[test]
fn relay_later_directive_replaces_earlier() {
    let policy = CookiePolicy::new(false);
    let jar = relay(
        CookieJar::new(),
        [CookieDirective::new("sb-access-token", "old"), CookieDirective::new("sb-access-token", "new")],
        &policy,
    );
    assert_eq!(jar.get("sb-access-token").map(Cookie::value), Some("new"));
}

// =============================================================================
// SessionCookies
// =============================================================================

#[test]
fn names_follow_prefix() {
    let names = SessionCookies::new("acad");
    assert_eq!(names.access, "acad-access-token");
    assert_eq!(names.refresh, "acad-refresh-token");
    assert_eq!(names.verifier, "acad-code-verifier");
}

#[test]
fn read_tokens_requires_access_token() {
    let names = SessionCookies::new("sb");
    assert_eq!(names.read_tokens(&jar_with("sb-refresh-token=rt")), None);
    assert_eq!(names.read_tokens(&jar_with("sb-access-token=; sb-refresh-token=rt")), None);
}

#[test]
fn read_tokens_collects_both() {
    let names = SessionCookies::new("sb");
    let tokens = names
        .read_tokens(&jar_with("theme=dark; sb-access-token=at; sb-refresh-token=rt"))
        .unwrap();
    assert_eq!(tokens.access_token, "at");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
}

#[test]
fn read_tokens_ignores_other_prefix() {
    let names = SessionCookies::new("sb");
    assert_eq!(names.read_tokens(&jar_with("other-access-token=at")), None);
}

#[test]
fn clear_directives_cover_both_tokens() {
    let names = SessionCookies::new("sb");
    let cleared: Vec<_> = names.clear_directives().into_iter().map(|d| d.name).collect();
    assert_eq!(cleared, vec!["sb-access-token", "sb-refresh-token"]);
}

#[test]
fn verifier_directive_is_short_lived() {
    let names = SessionCookies::new("sb");
    let directive = names.verifier_directive("abc");
    assert_eq!(directive.value, "abc");
    assert_eq!(directive.options.max_age, Some(CODE_VERIFIER_MAX_AGE));
    assert_eq!(directive.options.path.as_deref(), Some(CODE_VERIFIER_PATH));
    assert_eq!(names.code_verifier(&jar_with("sb-code-verifier=abc")).as_deref(), Some("abc"));
}

#[test]
fn verifier_cookie_keeps_issued_path_and_fills_the_rest() {
    let names = SessionCookies::new("sb");
    let policy = CookiePolicy::new(true);
    let set = policy.finalize(names.verifier_directive("abc"));
    assert_eq!(set.path(), Some(CODE_VERIFIER_PATH));
    assert_eq!(set.max_age(), Some(CODE_VERIFIER_MAX_AGE));
    assert_eq!(set.http_only(), Some(true));
    assert_eq!(set.secure(), Some(true));

    let cleared = policy.finalize(names.clear_verifier_directive());
    assert_eq!(cleared.path(), Some(CODE_VERIFIER_PATH));
    assert_eq!(cleared.max_age(), Some(Duration::ZERO));
}
