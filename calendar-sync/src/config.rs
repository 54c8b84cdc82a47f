use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default batch interval: every 3 hours
const DEFAULT_INTERVAL_SECS: u64 = 3 * 60 * 60;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Sync engine settings, read from `CALENDAR_SYNC_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled batch syncs
    pub interval_secs: u64,
    /// Hard time budget for one feed request
    pub fetch_timeout_secs: u64,
    /// How many days ahead of today imported blocks are written
    pub horizon_days: u32,
    /// User-Agent sent to feed servers
    pub user_agent: String,
    /// Whether the host process should run the recurring batch
    pub scheduler_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            user_agent: default_user_agent(),
            scheduler_enabled: true,
        }
    }
}

fn default_user_agent() -> String {
    format!("calendar-sync/{}", env!("CARGO_PKG_VERSION"))
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = SyncConfig::default();

        let config: SyncConfig = config::Config::builder()
            .set_default("interval_secs", defaults.interval_secs)?
            .set_default("fetch_timeout_secs", defaults.fetch_timeout_secs)?
            .set_default("horizon_days", u64::from(defaults.horizon_days))?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("scheduler_enabled", defaults.scheduler_enabled)?
            .add_source(config::Environment::with_prefix("CALENDAR_SYNC").try_parsing(true))
            .build()
            .context("Failed to read CALENDAR_SYNC_* settings")?
            .try_deserialize()
            .context("Invalid CALENDAR_SYNC_* settings")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall the scheduler or every fetch
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("CALENDAR_SYNC_INTERVAL_SECS must be greater than 0");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("CALENDAR_SYNC_FETCH_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Database settings shared by the CLI and the backend
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    /// Connect through rustls (required by most hosted Postgres providers)
    pub tls: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            tls: env::var("DATABASE_TLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("DATABASE_TLS must be true or false")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(10_800));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.horizon_days, 365);
        assert!(config.user_agent.starts_with("calendar-sync/"));
        assert!(config.scheduler_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = SyncConfig {
            interval_secs: 0,
            ..SyncConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CALENDAR_SYNC_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_fetch_timeout_is_rejected() {
        let config = SyncConfig {
            fetch_timeout_secs: 0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
