//! Worker configuration: composes the shared core config sections into
//! the one struct `main.rs` needs to build a store, a retry policy, and
//! a provider registry.

use anyhow::Result;
use notifyd_core::config::{CoreConfig, DispatcherConfig, FcmConfig, RetryConfig, WnsConfig};
use std::env;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub core: CoreConfig,
    pub retry: RetryConfig,
    pub dispatcher: DispatcherConfig,
    pub wns: Option<WnsConfig>,
    pub fcm: Option<FcmConfig>,
}

impl WorkerConfig {
    /// Load configuration from the environment. WNS/FCM credentials are
    /// optional: a platform is only registered if its full credential set
    /// is present, so a deployment can run with just the fake provider.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_with_only_core_fields_compiles() {
        let cfg = WorkerConfig {
            core: CoreConfig {
                database_url: "postgres://localhost/test".into(),
                db_max_connections: 10,
            },
            retry: RetryConfig::default(),
            dispatcher: DispatcherConfig::default(),
            wns: None,
            fcm: None,
        };
        assert_eq!(cfg.dispatcher.batch_size, 10);
    }
}
