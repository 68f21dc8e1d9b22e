//! Unified process: runs the ingest/status HTTP surface and the dispatcher
//! loop side by side, sharing one database pool and one shutdown signal.

use std::sync::Arc;

use anyhow::Result;
use notifyd_core::ProviderRegistry;
use notifyd_worker::providers::{FakeProvider, FcmProvider, WnsProvider};
use notifyd_worker::store::OutboxStore;
use sqlx::PgPool;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    notifyd_shared::init_env();
    let _guard = notifyd_shared::init_tracing("server");

    tracing::info!("starting notifyd unified server");

    let config = config::UnifiedConfig::from_env()?;
    tracing::info!("configuration loaded");

    let pool = notifyd_shared::init_db(&config.core).await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("database migrations completed");

    let shutdown = CancellationToken::new();

    let api_handle = spawn_api(pool.clone(), config.clone(), shutdown.clone());
    let worker_handle = spawn_worker(pool.clone(), config.clone(), shutdown.clone());

    tracing::info!("all services started");

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received");

    shutdown.cancel();

    let _ = tokio::join!(api_handle, worker_handle);

    tracing::info!("all services stopped gracefully");
    Ok(())
}

fn spawn_api(
    pool: PgPool,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let state = notifyd_api::AppState {
            store: OutboxStore::new(pool.clone()),
            pool,
        };
        let api_config = config.to_api_config();

        tokio::select! {
            result = notifyd_api::run_api(state, &api_config) => {
                tracing::error!(?result, "API service exited");
                result.map_err(|e| anyhow::anyhow!(e))
            }
            () = shutdown.cancelled() => {
                tracing::info!("API service shutting down");
                Ok(())
            }
        }
    })
}

fn spawn_worker(
    pool: PgPool,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let worker_config = config.to_worker_config();

        let mut registry = ProviderRegistry::new();
        registry.register("fake", Arc::new(FakeProvider))?;
        if let Some(wns) = worker_config.wns.clone() {
            registry.register("wns", Arc::new(WnsProvider::new(wns)))?;
        }
        if let Some(fcm) = worker_config.fcm.clone() {
            registry.register("fcm", Arc::new(FcmProvider::new(fcm)))?;
        }
        let registry = Arc::new(registry);

        let store = OutboxStore::new(pool);

        tokio::select! {
            () = notifyd_worker::run_dispatcher(store, registry, worker_config, shutdown.clone()) => {
                tracing::error!("dispatcher service exited");
            }
            () = shutdown.cancelled() => {
                tracing::info!("dispatcher service shutting down");
            }
        }
        Ok(())
    })
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
