//! Application configuration and injected collaborators.
//!
//! Every external dependency of the request path (stores, rate limiter,
//! audit sink, locality provider) is constructed once at startup and
//! injected through `AppState`, so tests can substitute in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers::auth::rate_limit::RateLimiter;
use crate::api::handlers::auth::store::{CredentialStore, SessionStore};
use crate::api::handlers::verify::audit::AuditSink;
use crate::api::handlers::verify::lookup::LocalityLookup;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_QUOTA: i64 = 30;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct AppConfig {
    session_ttl_seconds: i64,
    session_cookie_secure: bool,
    hash_cost: u32,
    rate_limit_quota: i64,
    rate_limit_window: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            hash_cost: bcrypt::DEFAULT_COST,
            rate_limit_quota: DEFAULT_RATE_LIMIT_QUOTA,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, quota: i64, window: Duration) -> Self {
        self.rate_limit_quota = quota;
        self.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    #[must_use]
    pub fn rate_limit_quota(&self) -> i64 {
        self.rate_limit_quota
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    config: AppConfig,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    audit: Arc<dyn AuditSink>,
    localities: Arc<dyn LocalityLookup>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
        localities: Arc<dyn LocalityLookup>,
    ) -> Self {
        Self {
            config,
            sessions,
            credentials,
            rate_limiter,
            audit,
            localities,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub(crate) fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub(crate) fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    pub(crate) fn localities(&self) -> &dyn LocalityLookup {
        self.localities.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_defaults_and_overrides() {
        let config = AppConfig::new();
        assert_eq!(config.session_ttl_seconds(), 7 * 24 * 60 * 60);
        assert!(!config.session_cookie_secure());
        assert_eq!(config.hash_cost(), bcrypt::DEFAULT_COST);
        assert_eq!(config.rate_limit_quota(), 30);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));

        let config = config
            .with_session_ttl_seconds(120)
            .with_secure_cookies(true)
            .with_hash_cost(4)
            .with_rate_limit(500, Duration::from_secs(10));

        assert_eq!(config.session_ttl_seconds(), 120);
        assert!(config.session_cookie_secure());
        assert_eq!(config.hash_cost(), 4);
        assert_eq!(config.rate_limit_quota(), 500);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(10));
    }
}
