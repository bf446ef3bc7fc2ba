//! Sliding-window rate limiting keyed by caller IP.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{error, Instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str) -> RateLimitDecision;
}

/// Limiter that never rejects. Useful in tests and local tooling.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Postgres-backed sliding window: count the key's events inside the
/// trailing window, then record the new event.
///
/// Count and insert are separate statements; two concurrent requests at the
/// quota boundary can both pass. Store failures fail closed (Limited).
/// Events live in their own table, so keys cannot collide with session rows.
#[derive(Debug, Clone)]
pub struct PgRateLimiter {
    pool: PgPool,
    quota: i64,
    window: Duration,
}

impl PgRateLimiter {
    #[must_use]
    pub fn new(pool: PgPool, quota: i64, window: Duration) -> Self {
        Self {
            pool,
            quota,
            window,
        }
    }

    fn window_seconds(&self) -> i64 {
        i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX)
    }

    async fn count_in_window(&self, key: &str) -> anyhow::Result<i64> {
        let query = r"
            SELECT COUNT(*) AS hits
            FROM rate_limit_events
            WHERE key = $1
              AND created_at > NOW() - ($2 * INTERVAL '1 second')
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(key)
            .bind(self.window_seconds())
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        Ok(row.get("hits"))
    }

    async fn record_event(&self, key: &str) -> anyhow::Result<()> {
        // Pruning bounds table growth; rows outside the window no longer count.
        let query = r"
            DELETE FROM rate_limit_events
            WHERE key = $1
              AND created_at <= NOW() - ($2 * INTERVAL '1 second')
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(key)
            .bind(self.window_seconds())
            .execute(&self.pool)
            .instrument(span)
            .await?;

        let query = "INSERT INTO rate_limit_events (key) VALUES ($1)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(key)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for PgRateLimiter {
    async fn check(&self, key: &str) -> RateLimitDecision {
        let count = match self.count_in_window(key).await {
            Ok(count) => count,
            Err(err) => {
                error!("Failed to count rate-limit events: {err}");
                return RateLimitDecision::Limited; // Fail closed
            }
        };

        if count >= self.quota {
            return RateLimitDecision::Limited;
        }

        if let Err(err) = self.record_event(key).await {
            error!("Failed to record rate-limit event: {err}");
            return RateLimitDecision::Limited;
        }

        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::Allowed);
        assert_eq!(limiter.check("unknown").await, RateLimitDecision::Allowed);
    }
}
