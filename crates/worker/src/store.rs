//! Outbox store (C1) — claim and state-transition queries against
//! `notification_messages`.
//!
//! Claiming uses `SELECT ... FOR UPDATE SKIP LOCKED` inside the same
//! statement that flips the row to `Processing`, so two dispatcher
//! instances racing on the same table never both win a row.

use chrono::{DateTime, Utc};
use notifyd_core::{FailureCategory, NewNotification, NotificationMessage, OutboxStatus};
use sqlx::PgPool;

use crate::error::{WorkerError, WorkerResult};

#[derive(Clone)]
pub struct OutboxStore {
    pool: PgPool,
}

impl OutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: &NewNotification) -> WorkerResult<NotificationMessage> {
        let row = sqlx::query_as::<_, NotificationMessage>(
            r#"
            INSERT INTO notification_messages
                (idempotency_key, target_platform, device_token, title, body,
                 data, tags, priority, status, retry_count, max_retries, scheduled_for)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Pending', 0, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&new.idempotency_key)
        .bind(&new.target_platform)
        .bind(&new.device_token)
        .bind(&new.title)
        .bind(&new.body)
        .bind(&new.data)
        .bind(&new.tags)
        .bind(new.priority)
        .bind(new.max_retries)
        .bind(new.scheduled_for)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                WorkerError::IdempotencyConflict(new.idempotency_key.clone())
            }
            _ => WorkerError::Db(e),
        })?;

        Ok(row)
    }

    pub async fn get_by_id(&self, id: uuid::Uuid) -> WorkerResult<Option<NotificationMessage>> {
        let row = sqlx::query_as::<_, NotificationMessage>(
            "SELECT * FROM notification_messages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_idempotency_key(
        &self,
        key: &str,
    ) -> WorkerResult<Option<NotificationMessage>> {
        let row = sqlx::query_as::<_, NotificationMessage>(
            "SELECT * FROM notification_messages WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Claim up to `limit` `Pending` rows whose `scheduled_for` has passed,
    /// ordered by `created_at` ascending, flipping them to `Processing`.
    pub async fn claim_pending(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> WorkerResult<Vec<NotificationMessage>> {
        let rows = sqlx::query_as::<_, NotificationMessage>(
            r#"
            UPDATE notification_messages
            SET status = 'Processing', last_attempt_utc = $2, updated_at = $2
            WHERE id IN (
                SELECT id FROM notification_messages
                WHERE status = 'Pending'
                  AND (scheduled_for IS NULL OR scheduled_for <= $2)
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Claim up to `limit` `Failed` rows whose retry budget isn't exhausted
    /// and whose `next_attempt_utc` has passed, ordered by `next_attempt_utc`.
    pub async fn claim_failed(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> WorkerResult<Vec<NotificationMessage>> {
        let rows = sqlx::query_as::<_, NotificationMessage>(
            r#"
            UPDATE notification_messages
            SET status = 'Processing', last_attempt_utc = $2, updated_at = $2
            WHERE id IN (
                SELECT id FROM notification_messages
                WHERE status = 'Failed'
                  AND retry_count < max_retries
                  AND (next_attempt_utc IS NULL OR next_attempt_utc <= $2)
                ORDER BY next_attempt_utc ASC NULLS LAST, updated_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_sent(&self, id: uuid::Uuid, now: DateTime<Utc>) -> WorkerResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_messages
            SET status = 'Sent', sent_at = $2, updated_at = $2, last_error = NULL, last_error_category = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Increments `retry_count`, sets `next_attempt_utc = now + delay`, and
    /// returns to `Failed` for the dispatcher to reclaim later.
    pub async fn mark_failed(
        &self,
        id: uuid::Uuid,
        error: &str,
        category: FailureCategory,
        next_attempt_utc: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WorkerResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_messages
            SET status = 'Failed',
                retry_count = retry_count + 1,
                next_attempt_utc = $3,
                last_error = $2,
                last_error_category = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(truncate(error))
        .bind(next_attempt_utc)
        .bind(category.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Also increments `retry_count`: the glossary defines it as counting
    /// completed attempts, and dead-lettering always happens after one.
    pub async fn mark_dead_lettered(
        &self,
        id: uuid::Uuid,
        reason: &str,
        category: FailureCategory,
        now: DateTime<Utc>,
    ) -> WorkerResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_messages
            SET status = 'DeadLettered',
                retry_count = retry_count + 1,
                last_error = $2,
                last_error_category = $3,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(truncate(reason))
        .bind(category.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// `last_error` has no hard limit in the data model beyond "truncated if
/// needed" (spec §3); cap generously so a misbehaving backend can't bloat
/// the row indefinitely.
fn truncate(s: &str) -> &str {
    const MAX: usize = 4096;
    if s.len() <= MAX {
        s
    } else {
        let mut end = MAX;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "a".repeat(4095) + "€€";
        let t = truncate(&s);
        assert!(t.len() <= 4096);
        assert!(s.starts_with(t));
    }

    #[test]
    fn truncate_is_noop_under_limit() {
        assert_eq!(truncate("short"), "short");
    }

    fn assert_status_enum(status: OutboxStatus) -> bool {
        matches!(
            status,
            OutboxStatus::Pending
                | OutboxStatus::Processing
                | OutboxStatus::Sent
                | OutboxStatus::Failed
                | OutboxStatus::DeadLettered
        )
    }

    #[test]
    fn status_values_are_exhaustively_handled() {
        assert!(assert_status_enum(OutboxStatus::Pending));
        assert!(assert_status_enum(OutboxStatus::Sent));
    }
}
