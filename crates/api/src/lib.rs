//! notifyd-api - HTTP ingest (C6) and status (C7) surface.

pub mod config;
pub mod error;
mod middleware;
mod routes;

use axum::extract::FromRef;
use axum::{middleware as axum_middleware, Router};
use notifyd_worker::OutboxStore;
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::{UserOrIpKeyExtractor, API_BURST_SIZE, API_PERIOD_MS};
use crate::middleware::security_headers::security_headers;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: OutboxStore,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for OutboxStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

/// Build the application router. `cors_origin` of `"*"` allows any origin;
/// anything else is parsed as a single allowed origin header value.
pub fn create_router(state: AppState, cors_origin: &str) -> Router {
    let cors = if cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        match cors_origin.parse::<axum::http::HeaderValue>() {
            Ok(origin) => CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any),
            Err(e) => panic!("invalid CORS_ALLOWED_ORIGIN configuration: {e}"),
        }
    };

    Router::new()
        .merge(routes::health::routes())
        .nest(
            "/",
            routes::notifications::routes().layer(GovernorLayer::new(
                GovernorConfigBuilder::default()
                    .period(std::time::Duration::from_millis(API_PERIOD_MS))
                    .burst_size(API_BURST_SIZE)
                    .key_extractor(UserOrIpKeyExtractor)
                    .finish()
                    .expect("failed to build API governor config"),
            )),
        )
        .layer(cors)
        .layer(axum_middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the API server until it exits.
pub async fn run_api(state: AppState, config: &config::Config) -> Result<(), std::io::Error> {
    let app = create_router(state, &config.cors_allowed_origin);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!(%addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
}
