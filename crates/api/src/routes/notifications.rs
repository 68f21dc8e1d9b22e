//! Ingest (C6) and status (C7) endpoints: the only two HTTP entry points
//! that touch the outbox. Neither ever calls a provider.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use notifyd_core::{NewNotification, NotificationId, Priority};
use notifyd_worker::OutboxStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

const MAX_IDEMPOTENCY_KEY_LEN: usize = 256;
const MAX_TARGET_PLATFORM_LEN: usize = 50;
const MAX_DEVICE_TOKEN_LEN: usize = 1024;
const MAX_TITLE_LEN: usize = 512;
const MAX_BODY_LEN: usize = 4096;
const MAX_TAGS_LEN: usize = 1024;
const DEFAULT_MAX_RETRIES: i32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub idempotency_key: Option<String>,
    pub target_platform: String,
    pub device_token: String,
    pub title: String,
    pub body: Option<String>,
    pub data: Option<HashMap<String, String>>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: NotificationId,
    pub status: notifyd_core::OutboxStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: NotificationId,
    pub status: notifyd_core::OutboxStatus,
    pub target_platform: String,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn validate(req: &IngestRequest) -> Result<(), ApiError> {
    if req.target_platform.trim().is_empty() {
        return Err(ApiError::BadRequest("targetPlatform is required".into()));
    }
    if req.target_platform.len() > MAX_TARGET_PLATFORM_LEN {
        return Err(ApiError::BadRequest("targetPlatform too long".into()));
    }
    if req.device_token.trim().is_empty() {
        return Err(ApiError::BadRequest("deviceToken is required".into()));
    }
    if req.device_token.len() > MAX_DEVICE_TOKEN_LEN {
        return Err(ApiError::BadRequest("deviceToken too long".into()));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    if req.title.len() > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest("title too long".into()));
    }
    if let Some(body) = &req.body
        && body.len() > MAX_BODY_LEN
    {
        return Err(ApiError::BadRequest("body too long".into()));
    }
    if let Some(key) = &req.idempotency_key
        && key.len() > MAX_IDEMPOTENCY_KEY_LEN
    {
        return Err(ApiError::BadRequest("idempotencyKey too long".into()));
    }
    Ok(())
}

async fn ingest(
    State(store): State<OutboxStore>,
    Json(req): Json<IngestRequest>,
) -> Result<Response, ApiError> {
    validate(&req)?;

    let idempotency_key = req
        .idempotency_key
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Some(existing) = store.get_by_idempotency_key(&idempotency_key).await? {
        let body = IngestResponse {
            id: existing.id,
            status: existing.status,
            message: "idempotency key already in use".to_string(),
        };
        return Ok((StatusCode::CONFLICT, Json(body)).into_response());
    }

    let tags = req.tags.filter(|t| !t.is_empty()).map(|t| {
        let joined = t.join(",");
        truncate(&joined, MAX_TAGS_LEN).to_string()
    });

    let new = NewNotification {
        idempotency_key,
        target_platform: req.target_platform,
        device_token: req.device_token,
        title: req.title,
        body: req.body.unwrap_or_default(),
        data: req.data.map(|m| serde_json::to_value(m).unwrap_or(serde_json::Value::Null)),
        tags,
        priority: req.priority.unwrap_or_default(),
        max_retries: DEFAULT_MAX_RETRIES,
        scheduled_for: req.scheduled_for,
    };

    let row = store.insert(&new).await?;

    let body = IngestResponse {
        id: row.id,
        status: row.status,
        message: "accepted".to_string(),
    };
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

async fn get_status(
    State(store): State<OutboxStore>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let row = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("notification not found: {id}")))?;

    Ok(Json(StatusResponse {
        id: row.id,
        status: row.status,
        target_platform: row.target_platform,
        retry_count: row.retry_count,
        created_at: row.created_at,
        sent_at: row.sent_at,
        error_message: row.last_error,
    }))
}

pub fn routes() -> Router<crate::AppState> {
    Router::new()
        .route("/notifications", post(ingest))
        .route("/notifications/{id}", get(get_status))
}

/// Byte-slices `s` to at most `max` bytes without splitting a UTF-8
/// character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> IngestRequest {
        IngestRequest {
            idempotency_key: None,
            target_platform: "fake".into(),
            device_token: "tok".into(),
            title: "hello".into(),
            body: None,
            data: None,
            tags: None,
            priority: None,
            scheduled_for: None,
        }
    }

    #[test]
    fn validate_accepts_minimal_request() {
        assert!(validate(&base_request()).is_ok());
    }

    #[test]
    fn validate_rejects_empty_target_platform() {
        let mut req = base_request();
        req.target_platform = String::new();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn validate_rejects_empty_device_token() {
        let mut req = base_request();
        req.device_token = "   ".into();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn validate_rejects_empty_title() {
        let mut req = base_request();
        req.title = String::new();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn validate_rejects_oversized_device_token() {
        let mut req = base_request();
        req.device_token = "a".repeat(MAX_DEVICE_TOKEN_LEN + 1);
        assert!(validate(&req).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "a".repeat(MAX_TAGS_LEN - 1) + "€€";
        let t = truncate(&s, MAX_TAGS_LEN);
        assert!(t.len() <= MAX_TAGS_LEN);
        assert!(s.starts_with(t));
    }

    #[test]
    fn ingest_request_deserializes_camel_case() {
        let json = r#"{
            "targetPlatform": "fake",
            "deviceToken": "tok",
            "title": "hi",
            "priority": "High"
        }"#;
        let req: IngestRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.target_platform, "fake");
        assert_eq!(req.priority, Some(Priority::High));
    }
}
