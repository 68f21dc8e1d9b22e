//! Core domain model for the notification outbox
//!
//! `NotificationMessage` is the single aggregate the whole system turns
//! around: ingest inserts it, the dispatcher claims and mutates it, and
//! both the status endpoint and operators only ever read it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::NotificationId;

/// Advisory delivery priority. Carried through to providers but never
/// changes dispatch ordering or retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_priority", rename_all = "PascalCase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Outbox row lifecycle state. See the state machine in `crate::retry`
/// and the dispatcher for the legal transitions between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "PascalCase")]
pub enum OutboxStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    DeadLettered,
}

impl OutboxStatus {
    /// Terminal states never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, OutboxStatus::Sent | OutboxStatus::DeadLettered)
    }
}

/// A single notification to be delivered to exactly one device on one
/// platform, tracked through the outbox state machine until it is sent
/// or dead-lettered.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationMessage {
    pub id: NotificationId,
    pub idempotency_key: String,
    pub target_platform: String,
    pub device_token: String,
    pub title: String,
    pub body: String,
    /// Opaque string -> string payload, persisted as a JSON object.
    #[sqlx(json)]
    pub data: Option<serde_json::Value>,
    /// Opaque, comma-separated on the wire; carried through untouched.
    pub tags: Option<String>,
    pub priority: Priority,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_attempt_utc: Option<DateTime<Utc>>,
    pub next_attempt_utc: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_category: Option<String>,
}

/// Fields required to create a new `NotificationMessage`. `idempotency_key`
/// is always populated by the caller (ingest generates one if the client
/// didn't supply it) so the store never has to.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub idempotency_key: String,
    pub target_platform: String,
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub tags: Option<String>,
    pub priority: Priority,
    pub max_retries: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sent_and_dead_lettered_are_terminal() {
        assert!(!OutboxStatus::Pending.is_terminal());
        assert!(!OutboxStatus::Processing.is_terminal());
        assert!(!OutboxStatus::Failed.is_terminal());
        assert!(OutboxStatus::Sent.is_terminal());
        assert!(OutboxStatus::DeadLettered.is_terminal());
    }

    #[test]
    fn priority_defaults_to_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
