//! Shared configuration structs
//!
//! Each service loads the slice it needs from environment variables; the
//! structs themselves are plain data so they can be constructed directly
//! in tests without touching the environment.

use anyhow::{Context, Result};
use std::env;

/// Configuration common to every service: the database connection.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub db_max_connections: u32,
}

impl CoreConfig {
    /// Load common configuration from environment variables.
    ///
    /// This will also initialize dotenv if it hasn't been done yet.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env_or(10, "DB_MAX_CONNECTIONS")?,
        })
    }
}

/// Exponential backoff parameters (C2). See `crate::retry::RetryPolicy`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub base_delay_s: i64,
    pub max_delay_s: i64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_s: 5,
            max_delay_s: 300,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            base_delay_s: env_or(defaults.base_delay_s, "RETRY_BASE_DELAY_S")?,
            max_delay_s: env_or(defaults.max_delay_s, "RETRY_MAX_DELAY_S")?,
            jitter_factor: env_or(defaults.jitter_factor, "RETRY_JITTER_FACTOR")?,
        })
    }
}

/// Dispatcher cycle parameters (C5).
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub batch_size: i64,
    pub poll_interval_s: u64,
    pub max_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval_s: 5,
            max_concurrency: 10,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: env_or(defaults.batch_size, "DISPATCHER_BATCH_SIZE")?,
            poll_interval_s: env_or(defaults.poll_interval_s, "DISPATCHER_POLL_INTERVAL_S")?,
            max_concurrency: env_or(defaults.max_concurrency, "DISPATCHER_MAX_CONCURRENCY")?,
        })
    }
}

/// Windows Push Notification Service credentials (OAuth2 client-credentials).
#[derive(Debug, Clone)]
pub struct WnsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

impl WnsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: env::var("WNS_CLIENT_ID").context("WNS_CLIENT_ID must be set")?,
            client_secret: env::var("WNS_CLIENT_SECRET")
                .context("WNS_CLIENT_SECRET must be set")?,
            tenant_id: env::var("WNS_TENANT_ID").context("WNS_TENANT_ID must be set")?,
        })
    }
}

/// Firebase-style (FCM) push credentials.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub server_key: String,
}

impl FcmConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            project_id: env::var("FCM_PROJECT_ID").context("FCM_PROJECT_ID must be set")?,
            server_key: env::var("FCM_SERVER_KEY").context("FCM_SERVER_KEY must be set")?,
        })
    }
}

fn env_or<T>(default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid value: {e}")),
        Err(_) => Ok(default),
    }
}
