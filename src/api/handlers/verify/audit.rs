//! Append-only audit log of verification attempts.
//!
//! Appends are invoked best-effort by the pipeline: the `Result` is the
//! sink's error channel, and the caller logs-and-continues rather than
//! failing the request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// One verification attempt: the caller, what they asked, and the outcome.
/// Never mutated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub user_id: Uuid,
    pub postcode: String,
    pub suburb: String,
    pub state: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Provision the backing table if it does not exist yet. Idempotent.
    async fn ensure_index(&self) -> Result<()>;

    /// Append one entry.
    async fn append(&self, entry: &LogEntry) -> Result<()>;

    /// Entries for a user at or after `since`, newest first.
    async fn entries_for_user(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<LogEntry>>;
}

#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn ensure_index(&self) -> Result<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS verification_logs (
                user_id UUID NOT NULL,
                postcode TEXT NOT NULL,
                suburb TEXT NOT NULL,
                state TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                success BOOLEAN NOT NULL,
                error_message TEXT
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS verification_logs_user_id_timestamp_idx
                ON verification_logs (user_id, timestamp)
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
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to provision verification log table")?;
        }

        Ok(())
    }

    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let query = r"
            INSERT INTO verification_logs
                (user_id, postcode, suburb, state, timestamp, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(entry.user_id)
            .bind(&entry.postcode)
            .bind(&entry.suburb)
            .bind(&entry.state)
            .bind(entry.timestamp)
            .bind(entry.success)
            .bind(&entry.error_message)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to append verification log entry")?;
        Ok(())
    }

    async fn entries_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        let query = r"
            SELECT user_id, postcode, suburb, state, timestamp, success, error_message
            FROM verification_logs
            WHERE user_id = $1
              AND timestamp >= $2
            ORDER BY timestamp DESC
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to query verification log entries")?;

        Ok(rows
            .into_iter()
            .map(|row| LogEntry {
                user_id: row.get("user_id"),
                postcode: row.get("postcode"),
                suburb: row.get("suburb"),
                state: row.get("state"),
                timestamp: row.get("timestamp"),
                success: row.get("success"),
                error_message: row.get("error_message"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_without_error_message_noise() {
        let entry = LogEntry {
            user_id: Uuid::nil(),
            postcode: "2000".to_string(),
            suburb: "Sydney".to_string(),
            state: "NSW".to_string(),
            timestamp: Utc::now(),
            success: true,
            error_message: None,
        };
        let value = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(value["success"], serde_json::Value::Bool(true));
        assert_eq!(value["error_message"], serde_json::Value::Null);
    }
}
