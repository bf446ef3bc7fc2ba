//! Store traits and Postgres implementations for credentials and sessions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// Value stored against a session token: enough to identify the caller
/// without a credential-store round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: Uuid,
    pub name: String,
}

/// A credential-store user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a user about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Outcome when attempting to create a new user.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertUserOutcome {
    Created,
    Conflict,
}

/// Key-value session storage with per-key expiry.
///
/// Keys are hashes of the opaque session token. Implementations must treat
/// expired entries as absent; expiry is passive, there is no sweep.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, token_hash: &[u8], session: &UserSession, ttl: Duration) -> Result<()>;
    async fn get(&self, token_hash: &[u8]) -> Result<Option<UserSession>>;
    async fn delete(&self, token_hash: &[u8]) -> Result<()>;
}

/// User records keyed by case-normalized email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn insert(&self, user: &NewUser) -> Result<InsertUserOutcome>;
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, token_hash: &[u8], session: &UserSession, ttl: Duration) -> Result<()> {
        // Opportunistic cleanup; expiry itself is enforced by the lookup filter.
        let query = "DELETE FROM user_sessions WHERE expires_at <= NOW()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to prune expired sessions")?;

        // Upsert keeps key-value overwrite semantics on hash collisions.
        let query = r"
            INSERT INTO user_sessions (token_hash, user_id, name, expires_at)
            VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
            ON CONFLICT (token_hash) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                name = EXCLUDED.name,
                expires_at = EXCLUDED.expires_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(session.user_id)
            .bind(&session.name)
            .bind(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<UserSession>> {
        // Only unexpired sessions resolve.
        let query = r"
            SELECT user_id, name
            FROM user_sessions
            WHERE token_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| UserSession {
            user_id: row.get("user_id"),
            name: row.get("name"),
        }))
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        // Revocation is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM user_sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = r"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        }))
    }

    async fn insert(&self, user: &NewUser) -> Result<InsertUserOutcome> {
        let query = r"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertUserOutcome::Created),
            // The unique index closes the lookup-before-insert race.
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }
}

/// Create the credential, session and rate-limit tables if absent.
///
/// Runs once at startup; every statement is idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS user_sessions (
            token_hash BYTEA PRIMARY KEY,
            user_id UUID NOT NULL,
            name TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS rate_limit_events (
            key TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
        r"
        CREATE INDEX IF NOT EXISTS rate_limit_events_key_created_at_idx
            ON rate_limit_events (key, created_at)
        ",
    ];

    for statement in statements {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = statement
        );
        sqlx::query(statement)
            .execute(pool)
            .instrument(span)
            .await
            .context("failed to provision schema")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{InsertUserOutcome, NewUser, UserSession};
    use uuid::Uuid;

    #[test]
    fn insert_outcome_debug_names() {
        assert_eq!(format!("{:?}", InsertUserOutcome::Created), "Created");
        assert_eq!(format!("{:?}", InsertUserOutcome::Conflict), "Conflict");
    }

    #[test]
    fn user_session_round_trips() {
        let session = UserSession {
            user_id: Uuid::nil(),
            name: "Alice".to_string(),
        };
        let value = serde_json::to_value(&session).expect("serialize session");
        let decoded: UserSession = serde_json::from_value(value).expect("deserialize session");
        assert_eq!(decoded, session);
    }

    #[test]
    fn new_user_holds_values() {
        let user = NewUser {
            id: Uuid::nil(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
        };
        assert_eq!(user.id, Uuid::nil());
        assert_eq!(user.email, "alice@example.com");
    }
}
