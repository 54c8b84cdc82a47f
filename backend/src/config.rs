use anyhow::{Context, Result};
use calendar_sync::{DatabaseConfig, SyncConfig};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database: DatabaseConfig::from_env()?,
            sync: SyncConfig::from_env()?,
        })
    }
}
