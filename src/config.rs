use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::Error;

/// Settings read from the environment once at startup.
#[derive(Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub bind_address: String,
    pub reconcile_interval: Duration,
    pub reconcile_on_startup: bool,
    pub watch_retry: Duration,
    pub seed: bool,
    pub admin_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, Error> {
        let reconcile_interval: u64 = try_load(&lookup, "RECONCILE_INTERVAL_SECS", "86400")?;
        if reconcile_interval == 0 {
            return Err(Error::InvalidConfig {
                key: "RECONCILE_INTERVAL_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            mongodb_uri: try_load(&lookup, "MONGODB_URI", "mongodb://localhost:27017")?,
            mongodb_database: try_load(&lookup, "MONGODB_DATABASE", "campaign_stats")?,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "127.0.0.1:8080")?,
            reconcile_interval: Duration::from_secs(reconcile_interval),
            reconcile_on_startup: try_load(&lookup, "RECONCILE_ON_STARTUP", "false")?,
            watch_retry: Duration::from_secs(try_load(&lookup, "WATCH_RETRY_SECS", "5")?),
            seed: try_load(&lookup, "SEED", "false")?,
            admin_token: lookup("ADMIN_TOKEN").filter(|token| !token.trim().is_empty()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mongodb_uri", &self.mongodb_uri)
            .field("mongodb_database", &self.mongodb_database)
            .field("bind_address", &self.bind_address)
            .field("reconcile_interval", &self.reconcile_interval)
            .field("reconcile_on_startup", &self.reconcile_on_startup)
            .field("watch_retry", &self.watch_retry)
            .field("seed", &self.seed)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, Error>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|err: T::Err| Error::InvalidConfig {
            key: key.to_string(),
            reason: err.to_string(),
        })
}
