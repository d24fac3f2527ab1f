use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::QueueError;

/// Runtime configuration, read from the environment (a `.env` file is
/// honored). The visibility timeout is the only tunable the core depends on;
/// the Redis URL matters only when the shared-store backend is selected.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a leased message stays invisible before it becomes eligible
    /// for redelivery.
    pub visibility_timeout: Duration,
    pub redis_url: Option<String>,
}

impl Config {
    /// Default visibility timeout: 30 seconds.
    pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 30;

    /// Load from `VISIBILITY_TIMEOUT_SECS` and `REDIS_URL`. Missing variables
    /// fall back to defaults; malformed values are configuration errors.
    pub fn from_env() -> Result<Self, QueueError> {
        dotenv().ok();

        let visibility_timeout = match env::var("VISIBILITY_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    QueueError::InvalidConfig(format!(
                        "VISIBILITY_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                    ))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(Self::DEFAULT_VISIBILITY_TIMEOUT_SECS),
        };

        Ok(Self {
            visibility_timeout,
            redis_url: env::var("REDIS_URL").ok(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(Self::DEFAULT_VISIBILITY_TIMEOUT_SECS),
            redis_url: None,
        }
    }
}
