//! notifyd-worker binary entrypoint: runs the dispatcher standalone,
//! for deployments that split ingest and dispatch into separate processes.

use std::sync::Arc;

use notifyd_core::ProviderRegistry;
use notifyd_worker::config::WorkerConfig;
use notifyd_worker::providers::{FakeProvider, FcmProvider, WnsProvider};
use notifyd_worker::store::OutboxStore;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = WorkerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.core.database_url)
        .await?;

    let mut registry = ProviderRegistry::new();
    registry.register("fake", Arc::new(FakeProvider))?;
    if let Some(wns) = config.wns.clone() {
        registry.register("wns", Arc::new(WnsProvider::new(wns)))?;
    }
    if let Some(fcm) = config.fcm.clone() {
        registry.register("fcm", Arc::new(FcmProvider::new(fcm)))?;
    }
    let registry = Arc::new(registry);

    let store = OutboxStore::new(pool);
    let shutdown = CancellationToken::new();

    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.cancel();
    });

    notifyd_worker::run_dispatcher(store, registry, config, shutdown).await;
    Ok(())
}
