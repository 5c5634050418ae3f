//! Typed configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup loads `.env` (if present) via `dotenvy`, then builds an
//! `AppConfig` once and injects it through `AppState`. Nothing else reads
//! the process environment after startup.

use std::path::PathBuf;

use crate::guard::RouteTable;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COOKIE_PREFIX: &str = "sb";
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Connection settings for the hosted auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co` (no trailing slash).
    pub url: String,
    /// Public anon key sent as the `apikey` header.
    pub anon_key: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    /// Load from `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first absent variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = non_empty_var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = non_empty_var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_owned(),
            anon_key,
            request_timeout_secs: env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS)?,
            connect_timeout_secs: env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS)?,
        })
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Public origin used to build email links (`/auth/callback` etc).
    pub app_url: String,
    /// Directory holding the pre-rendered site pages.
    pub site_dir: PathBuf,
    /// Force the `Secure` attribute on every session cookie.
    pub cookie_secure: bool,
    pub cookie_prefix: String,
    pub routes: RouteTable,
    /// `None` when the backend env vars are missing; the server still starts.
    pub backend: Option<BackendConfig>,
    /// Names of required backend variables that were missing at startup.
    pub missing: Vec<&'static str>,
}

impl AppConfig {
    /// Build the full config from the environment.
    ///
    /// Required for auth (reported, not fatal):
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `PORT` (default 3000)
    /// - `APP_URL` (default `http://localhost:<PORT>`)
    /// - `SITE_DIR` (default `<crate>/site`)
    /// - `COOKIE_SECURE` (default: true when `APP_URL` is https)
    /// - `COOKIE_PREFIX` (default `sb`)
    /// - `AUTH_REQUEST_TIMEOUT_SECS` / `AUTH_CONNECT_TIMEOUT_SECS`
    /// - `GUARD_AUTH_ROUTES` / `GUARD_PROTECTED_ROUTES` (comma separated)
    ///
    /// # Errors
    ///
    /// Returns an error if an optional variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT", DEFAULT_PORT)?;
        let app_url = non_empty_var("APP_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let site_dir = std::env::var("SITE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("site"));
        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| app_url.starts_with("https://"));
        let cookie_prefix = non_empty_var("COOKIE_PREFIX").unwrap_or_else(|| DEFAULT_COOKIE_PREFIX.to_owned());

        let mut routes = RouteTable::default();
        if let Some(list) = non_empty_var("GUARD_AUTH_ROUTES") {
            routes.auth_routes = parse_route_list("GUARD_AUTH_ROUTES", &list)?;
        }
        if let Some(list) = non_empty_var("GUARD_PROTECTED_ROUTES") {
            routes.protected_routes = parse_route_list("GUARD_PROTECTED_ROUTES", &list)?;
        }

        let (backend, missing) = match BackendConfig::from_env() {
            Ok(backend) => (Some(backend), Vec::new()),
            Err(ConfigError::Missing(_)) => (None, missing_backend_vars()),
            Err(e) => return Err(e),
        };

        Ok(Self { port, app_url, site_dir, cookie_secure, cookie_prefix, routes, backend, missing })
    }
}

fn missing_backend_vars() -> Vec<&'static str> {
    ["SUPABASE_URL", "SUPABASE_ANON_KEY"]
        .into_iter()
        .filter(|var| non_empty_var(var).is_none())
        .collect()
}

/// Parse a comma-separated route list. Every entry must start with `/`.
pub(crate) fn parse_route_list(var: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut routes = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if !entry.starts_with('/') {
            return Err(ConfigError::Invalid { var, value: entry.to_owned() });
        }
        let trimmed = entry.trim_end_matches('/');
        routes.push(if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() });
    }
    if routes.is_empty() {
        return Err(ConfigError::Invalid { var, value: raw.to_owned() });
    }
    Ok(routes)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var: key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
