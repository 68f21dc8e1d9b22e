//! Unified configuration for the single-process deployment: one
//! `CoreConfig` plus the per-service settings, bridged into the shapes
//! `notifyd-api` and `notifyd-worker` expect.

use anyhow::Result;
use notifyd_core::config::{CoreConfig, DispatcherConfig, FcmConfig, RetryConfig, WnsConfig};
use std::env;

#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub core: CoreConfig,
    pub api: ApiSettings,
    pub retry: RetryConfig,
    pub dispatcher: DispatcherConfig,
    pub wns: Option<WnsConfig>,
    pub fcm: Option<FcmConfig>,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origin: String,
}

impl UnifiedConfig {
    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;

        Ok(Self {
            core,
            api: ApiSettings {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "3000".into())
                    .parse()?,
                cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                    .unwrap_or_else(|_| "*".into()),
            },
            retry: RetryConfig::from_env()?,
            dispatcher: DispatcherConfig::from_env()?,
            wns: if env::var("WNS_CLIENT_ID").is_ok() {
                Some(WnsConfig::from_env()?)
            } else {
                None
            },
            fcm: if env::var("FCM_PROJECT_ID").is_ok() {
                Some(FcmConfig::from_env()?)
            } else {
                None
            },
        })
    }

    pub fn to_api_config(&self) -> notifyd_api::config::Config {
        notifyd_api::config::Config::new(
            self.api.host.clone(),
            self.api.port,
            self.core.database_url.clone(),
            self.api.cors_allowed_origin.clone(),
        )
    }

    pub fn to_worker_config(&self) -> notifyd_worker::config::WorkerConfig {
        notifyd_worker::config::WorkerConfig {
            core: self.core.clone(),
            retry: self.retry,
            dispatcher: self.dispatcher,
            wns: self.wns.clone(),
            fcm: self.fcm.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridges_preserve_shared_database_url() {
        let cfg = UnifiedConfig {
            core: CoreConfig {
                database_url: "postgres://localhost/test".into(),
                db_max_connections: 10,
            },
            api: ApiSettings {
                host: "0.0.0.0".into(),
                port: 3000,
                cors_allowed_origin: "*".into(),
            },
            retry: RetryConfig::default(),
            dispatcher: DispatcherConfig::default(),
            wns: None,
            fcm: None,
        };

        let api_config = cfg.to_api_config();
        let worker_config = cfg.to_worker_config();
        assert_eq!(api_config.database_url, "postgres://localhost/test");
        assert_eq!(worker_config.core.database_url, "postgres://localhost/test");
    }
}
