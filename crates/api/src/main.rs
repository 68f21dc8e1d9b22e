//! notifyd-api binary entrypoint: the ingest + status HTTP surface (C6/C7).

use anyhow::Result;
use notifyd_api::config::Config;
use notifyd_api::AppState;
use notifyd_worker::OutboxStore;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notifyd_api=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting notifyd-api");

    let config = Config::from_env()?;

    let pool = PgPool::connect(&config.database_url).await?;
    tracing::info!("database connection pool established");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("database migrations completed");

    let state = AppState {
        store: OutboxStore::new(pool.clone()),
        pool,
    };

    notifyd_api::run_api(state, &config).await?;
    Ok(())
}
