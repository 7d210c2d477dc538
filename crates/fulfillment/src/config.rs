//! Fulfillment configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RESTOCK_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `RESTOCK_DEMAND_CACHE_TTL_SECS` - Demand cache entry lifetime (default: 120)
//! - `RESTOCK_CACHE_SWEEP_SECS` - Expired-entry sweep interval (default: 60)
//! - `RESTOCK_EVENT_CHANNEL_CAPACITY` - Observer channel capacity (default: 64)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_DEMAND_CACHE_TTL_SECS: u64 = 120;
const DEFAULT_CACHE_SWEEP_SECS: u64 = 60;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Fulfillment service configuration.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Lifetime of a cached demand computation
    pub demand_cache_ttl: Duration,
    /// Interval between expired-entry sweeps
    pub cache_sweep_interval: Duration,
    /// Capacity of the observer broadcast channel
    pub event_channel_capacity: usize,
}

impl FulfillmentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("RESTOCK_DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("RESTOCK_DATABASE_URL".to_string()))?;

        Ok(Self {
            database_url: SecretString::from(database_url),
            demand_cache_ttl: Duration::from_secs(parse_optional(
                "RESTOCK_DEMAND_CACHE_TTL_SECS",
                DEFAULT_DEMAND_CACHE_TTL_SECS,
            )?),
            cache_sweep_interval: Duration::from_secs(parse_optional(
                "RESTOCK_CACHE_SWEEP_SECS",
                DEFAULT_CACHE_SWEEP_SECS,
            )?),
            event_channel_capacity: parse_optional(
                "RESTOCK_EVENT_CHANNEL_CAPACITY",
                DEFAULT_EVENT_CHANNEL_CAPACITY,
            )?,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_falls_back() {
        let value: u64 = parse_optional("RESTOCK_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }
}
