//! Shared in-memory fakes and fixtures for handler tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::handlers::auth::rate_limit::{NoopRateLimiter, RateLimitDecision, RateLimiter};
use crate::api::handlers::auth::store::{
    CredentialStore, InsertUserOutcome, NewUser, SessionStore, User, UserSession,
};
use crate::api::handlers::auth::utils::hash_session_token;
use crate::api::handlers::verify::audit::{AuditSink, LogEntry};
use crate::api::handlers::verify::input::AuState;
use crate::api::handlers::verify::locality::Locality;
use crate::api::handlers::verify::lookup::LocalityLookup;
use crate::api::state::{AppConfig, AppState};

/// Session store over a hash map, expiring entries by `Instant`.
#[derive(Default)]
pub(crate) struct MemorySessionStore {
    entries: Mutex<HashMap<Vec<u8>, (UserSession, Instant)>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token_hash: &[u8], session: &UserSession, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expires_at)| *expires_at > Instant::now());
        entries.insert(token_hash.to_vec(), (session.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<UserSession>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(session, _)| session.clone()))
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(token_hash);
        Ok(())
    }
}

/// Credential store over a hash map keyed by email.
#[derive(Default)]
pub(crate) struct MemoryCredentialStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    pub(crate) async fn user_by_email(&self, email: &str) -> Option<User> {
        self.users.lock().await.get(email).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.user_by_email(email).await)
    }

    async fn insert(&self, user: &NewUser) -> Result<InsertUserOutcome> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Ok(InsertUserOutcome::Conflict);
        }
        users.insert(
            user.email.clone(),
            User {
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(InsertUserOutcome::Created)
    }
}

/// Recording audit sink; appends can be made to fail.
#[derive(Default)]
pub(crate) struct MemoryAuditSink {
    entries: Mutex<Vec<LogEntry>>,
    fail_appends: AtomicBool,
    ensure_calls: AtomicUsize,
}

impl MemoryAuditSink {
    pub(crate) async fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().await.clone()
    }

    pub(crate) fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn ensure_index(&self) -> Result<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append(&self, entry: &LogEntry) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            bail!("audit sink unavailable");
        }
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn entries_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        let mut entries: Vec<LogEntry> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.timestamp >= since)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

/// Lookup returning a fixed list for every query.
#[derive(Default)]
pub(crate) struct StaticLocalities {
    localities: Vec<Locality>,
}

impl StaticLocalities {
    pub(crate) fn new(localities: Vec<Locality>) -> Self {
        Self { localities }
    }
}

#[async_trait]
impl LocalityLookup for StaticLocalities {
    async fn lookup(&self, _postcode: &str, _state: AuState) -> Result<Vec<Locality>> {
        Ok(self.localities.clone())
    }
}

/// Lookup that always fails, standing in for an unreachable provider.
pub(crate) struct FailingLookup;

#[async_trait]
impl LocalityLookup for FailingLookup {
    async fn lookup(&self, _postcode: &str, _state: AuState) -> Result<Vec<Locality>> {
        bail!("provider unreachable")
    }
}

/// Limiter that rejects everything.
pub(crate) struct BlockedRateLimiter;

#[async_trait]
impl RateLimiter for BlockedRateLimiter {
    async fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Limited
    }
}

/// A fully wired `AppState` over in-memory collaborators, with handles to
/// each fake for assertions.
pub(crate) struct TestApp {
    pub(crate) state: Arc<AppState>,
    pub(crate) sessions: Arc<MemorySessionStore>,
    pub(crate) credentials: Arc<MemoryCredentialStore>,
    pub(crate) audit: Arc<MemoryAuditSink>,
    config: AppConfig,
    rate_limiter: Arc<dyn RateLimiter>,
    localities: Arc<dyn LocalityLookup>,
}

impl TestApp {
    pub(crate) fn new() -> Self {
        // Low hash cost keeps credential tests fast.
        Self::with_config(AppConfig::new().with_hash_cost(4))
    }

    pub(crate) fn with_config(config: AppConfig) -> Self {
        let sessions = Arc::new(MemorySessionStore::default());
        let credentials = Arc::new(MemoryCredentialStore::default());
        let audit = Arc::new(MemoryAuditSink::default());
        let rate_limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        let localities: Arc<dyn LocalityLookup> = Arc::new(StaticLocalities::default());
        let state = Arc::new(AppState::new(
            config.clone(),
            sessions.clone(),
            credentials.clone(),
            rate_limiter.clone(),
            audit.clone(),
            localities.clone(),
        ));
        Self {
            state,
            sessions,
            credentials,
            audit,
            config,
            rate_limiter,
            localities,
        }
    }

    pub(crate) fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self.rebuild();
        self
    }

    pub(crate) fn with_localities(mut self, localities: Vec<Locality>) -> Self {
        self.localities = Arc::new(StaticLocalities::new(localities));
        self.rebuild();
        self
    }

    pub(crate) fn with_failing_lookup(mut self) -> Self {
        self.localities = Arc::new(FailingLookup);
        self.rebuild();
        self
    }

    fn rebuild(&mut self) {
        self.state = Arc::new(AppState::new(
            self.config.clone(),
            self.sessions.clone(),
            self.credentials.clone(),
            self.rate_limiter.clone(),
            self.audit.clone(),
            self.localities.clone(),
        ));
    }

    /// Store a session directly and return headers carrying its cookie.
    pub(crate) async fn signed_in(&self, name: &str) -> (Uuid, HeaderMap) {
        let user_id = Uuid::new_v4();
        let session = UserSession {
            user_id,
            name: name.to_string(),
        };
        let token = format!("test-token-{user_id}");
        let token_hash = hash_session_token(&token);
        self.sessions
            .put(&token_hash, &session, Duration::from_secs(3600))
            .await
            .expect("store session");

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("session-id={token}")).expect("cookie header"),
        );
        (user_id, headers)
    }

    /// Insert a user with a bcrypt hash of `password`.
    pub(crate) async fn register_user(&self, name: &str, email: &str, password: &str) -> Uuid {
        let password_hash = bcrypt::hash(password, 4).expect("hash password");
        let user = NewUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        };
        let outcome = self.credentials.insert(&user).await.expect("insert user");
        assert_eq!(outcome, InsertUserOutcome::Created);
        user.id
    }
}
