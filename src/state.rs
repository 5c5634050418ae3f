//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the route guard via the
//! `State` extractor. It owns the single auth backend client, built once at
//! startup and shared behind an `Arc`. There is no mutable shared state.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::cookies::{CookiePolicy, SessionCookies};
use crate::services::auth::AuthBackend;

/// Shared application state. Clone is required by Axum; every field is
/// `Arc`-wrapped or `Copy`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthBackend>,
    pub cookies: Arc<SessionCookies>,
    pub cookie_policy: CookiePolicy,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, auth: Arc<dyn AuthBackend>) -> Self {
        let cookies = Arc::new(SessionCookies::new(&config.cookie_prefix));
        let cookie_policy = CookiePolicy::new(config.cookie_secure);
        Self { config: Arc::new(config), auth, cookies, cookie_policy, started_at: Instant::now() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::config::BackendConfig;
    use crate::guard::RouteTable;
    use crate::services::auth::{AuthError, AuthSession, AuthUser, EmailLinkOptions, SessionTokens};

    pub const GOOD_PASSWORD: &str = "correct-horse-battery";
    pub const GOOD_CODE: &str = "good-code";
    pub const TAKEN_EMAIL: &str = "taken@example.com";

    /// How the mock answers session lookups.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Lookup {
        Present,
        Absent,
        Fail,
    }

    /// Scripted `AuthBackend` that records every call.
    pub struct MockAuth {
        lookup: Lookup,
        /// Every non-lookup call fails as if the backend were unreachable.
        down: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockAuth {
        #[must_use]
        pub fn new(lookup: Lookup) -> Self {
            Self { lookup, down: false, calls: Mutex::new(Vec::new()) }
        }

        #[must_use]
        pub fn unreachable() -> Self {
            Self { lookup: Lookup::Fail, down: true, calls: Mutex::new(Vec::new()) }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) -> Result<(), AuthError> {
            self.calls.lock().unwrap().push(call.into());
            if self.down {
                return Err(AuthError::Request("connection refused".into()));
            }
            Ok(())
        }
    }

    #[must_use]
    pub fn test_user() -> AuthUser {
        AuthUser { id: Uuid::nil(), email: Some("ada@example.com".into()), email_confirmed_at: None }
    }

    #[must_use]
    pub fn test_session(suffix: u8) -> AuthSession {
        AuthSession {
            access_token: format!("at-{suffix}"),
            refresh_token: format!("rt-{suffix}"),
            expires_in: Some(3600),
            user: test_user(),
        }
    }

    fn rejected(status: u16, message: &str) -> AuthError {
        AuthError::Response { status, message: message.into() }
    }

    #[async_trait::async_trait]
    impl AuthBackend for MockAuth {
        async fn lookup_session(&self, tokens: &SessionTokens) -> Result<Option<AuthUser>, AuthError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("lookup:{}", tokens.access_token));
            match self.lookup {
                Lookup::Present => Ok(Some(test_user())),
                Lookup::Absent => Ok(None),
                Lookup::Fail => Err(AuthError::Request("connection refused".into())),
            }
        }

        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
            self.record(format!("sign_in:{email}"))?;
            if password == GOOD_PASSWORD {
                Ok(test_session(1))
            } else {
                Err(rejected(400, "Invalid login credentials"))
            }
        }

        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            full_name: Option<&str>,
            link: &EmailLinkOptions,
        ) -> Result<(), AuthError> {
            self.record(format!("sign_up:{email}:{}:{}", full_name.unwrap_or("-"), link.redirect_to))?;
            if email == TAKEN_EMAIL {
                return Err(rejected(422, "User already registered"));
            }
            Ok(())
        }

        async fn recover(&self, email: &str, link: &EmailLinkOptions) -> Result<(), AuthError> {
            self.record(format!("recover:{email}:{}", link.redirect_to))?;
            if email == TAKEN_EMAIL {
                return Ok(());
            }
            Err(rejected(404, "User not found"))
        }

        async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<AuthSession, AuthError> {
            self.record(format!("exchange:{code}:{code_verifier}"))?;
            if code == GOOD_CODE && !code_verifier.is_empty() {
                Ok(test_session(1))
            } else {
                Err(rejected(400, "invalid flow state"))
            }
        }

        async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
            self.record(format!("refresh:{refresh_token}"))?;
            if refresh_token.starts_with("rt-") {
                Ok(test_session(2))
            } else {
                Err(rejected(400, "Invalid Refresh Token"))
            }
        }

        async fn update_password(&self, access_token: &str, _password: &str) -> Result<(), AuthError> {
            self.record(format!("update_password:{access_token}"))?;
            Ok(())
        }

        async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
            self.record(format!("sign_out:{access_token}"))
        }
    }

    #[must_use]
    pub fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            app_url: "https://academy.example".into(),
            site_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("site"),
            cookie_secure: false,
            cookie_prefix: "sb".into(),
            routes: RouteTable::default(),
            backend: Some(BackendConfig {
                url: "https://project.example.co".into(),
                anon_key: "anon".into(),
                request_timeout_secs: 10,
                connect_timeout_secs: 5,
            }),
            missing: Vec::new(),
        }
    }

    /// `AppState` over a shared mock so tests can inspect recorded calls.
    #[must_use]
    pub fn test_app_state(mock: Arc<MockAuth>) -> AppState {
        AppState::new(test_config(), mock)
    }
}
