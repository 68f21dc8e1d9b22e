//! API server configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_allowed_origin: String,
}

impl Config {
    pub fn new(host: String, port: u16, database_url: String, cors_allowed_origin: String) -> Self {
        Self {
            host,
            port,
            database_url,
            cors_allowed_origin,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("API_PORT must be a valid u16")?,
            env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        ))
    }
}
