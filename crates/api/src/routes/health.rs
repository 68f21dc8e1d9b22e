//! Health check endpoint (C7 adjacent): reports database reachability.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health_check(State(pool): State<PgPool>) -> Response {
    match sqlx::query("SELECT 1").fetch_one(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "Healthy",
                timestamp: Utc::now(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "Unhealthy",
                    timestamp: Utc::now(),
                }),
            )
                .into_response()
        }
    }
}

pub fn routes() -> Router<crate::AppState> {
    Router::new().route("/health", get(health_check))
}
