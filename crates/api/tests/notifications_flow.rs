//! Integration tests for the ingest (C6) and status (C7) HTTP surface.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use notifyd_api::{create_router, AppState};
use notifyd_worker::OutboxStore;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower::ServiceExt;

fn create_request(method: &str, uri: impl AsRef<str>, body: Body) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri.as_ref())
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        8080,
    )));
    req
}

fn app(pool: PgPool) -> axum::Router {
    let state = AppState { pool: pool.clone(), store: OutboxStore::new(pool) };
    create_router(state, "*")
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingest_then_status_round_trips(pool: PgPool) -> sqlx::Result<()> {
    let router = app(pool);

    let ingest_body = json!({
        "targetPlatform": "fake",
        "deviceToken": "device-1",
        "title": "hello",
        "body": "world",
    });
    let res = router
        .clone()
        .oneshot(create_request(
            "POST",
            "/notifications",
            Body::from(ingest_body.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    let id = parsed["id"].as_str().unwrap().to_string();
    assert_eq!(parsed["status"], "Pending");

    let res = router
        .clone()
        .oneshot(create_request("GET", format!("/notifications/{id}"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["id"], id);
    assert_eq!(parsed["status"], "Pending");
    assert_eq!(parsed["retryCount"], 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_idempotency_key_replays_409(pool: PgPool) -> sqlx::Result<()> {
    let router = app(pool);
    let body = json!({
        "idempotencyKey": "same-key",
        "targetPlatform": "fake",
        "deviceToken": "device-1",
        "title": "hello",
    });

    let first = router
        .clone()
        .oneshot(create_request("POST", "/notifications", Body::from(body.to_string())))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let first_parsed: Value = serde_json::from_slice(&bytes).unwrap();

    let second = router
        .clone()
        .oneshot(create_request("POST", "/notifications", Body::from(body.to_string())))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let bytes = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
    let second_parsed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(second_parsed["id"], first_parsed["id"]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn status_returns_404_for_unknown_id(pool: PgPool) -> sqlx::Result<()> {
    let router = app(pool);
    let unknown = uuid::Uuid::new_v4();

    let res = router
        .oneshot(create_request("GET", format!("/notifications/{unknown}"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingest_rejects_missing_required_fields(pool: PgPool) -> sqlx::Result<()> {
    let router = app(pool);
    let body = json!({ "targetPlatform": "fake", "deviceToken": "", "title": "hello" });

    let res = router
        .oneshot(create_request("POST", "/notifications", Body::from(body.to_string())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
