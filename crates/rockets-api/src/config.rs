//! Server configuration read from the environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use rockets_messaging::DEFAULT_DEDUPLICATION_TTL;
use rockets_rocket::domain::aggregates::GuardPolicy;
use rockets_sync::MutexOptions;

use crate::error::AppError;

/// Runtime configuration of the API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Coordination store. `None` selects in-memory lock store and
    /// deduplicator, which only coordinate within this process.
    pub redis_url: Option<String>,
    /// Distributed mutex tuning.
    pub mutex: MutexOptions,
    /// Deduplication retention window.
    pub dedup_ttl: Duration,
    /// Aggregate ordering predicate.
    pub guard: GuardPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            redis_url: None,
            mutex: MutexOptions::default(),
            dedup_ttl: DEFAULT_DEDUPLICATION_TTL,
            guard: GuardPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset or empty variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let defaults = Self::default();
        let mutex_defaults = defaults.mutex.clone();

        let expiry_secs = parse_or(&get, "MUTEX_EXPIRY_SECONDS", mutex_defaults.expiry.as_secs())?;
        if expiry_secs == 0 {
            return Err(AppError::Config(
                "MUTEX_EXPIRY_SECONDS must be greater than zero".into(),
            ));
        }
        let timeout_factor = parse_or(&get, "MUTEX_TIMEOUT_FACTOR", mutex_defaults.timeout_factor)?;
        if !(0.0..=1.0).contains(&timeout_factor) {
            return Err(AppError::Config(format!(
                "MUTEX_TIMEOUT_FACTOR must be between 0 and 1, got {timeout_factor}"
            )));
        }
        let dedup_ttl_secs = parse_or(&get, "DEDUP_TTL_SECONDS", defaults.dedup_ttl.as_secs())?;
        if dedup_ttl_secs == 0 {
            return Err(AppError::Config(
                "DEDUP_TTL_SECONDS must be greater than zero".into(),
            ));
        }
        let retry_delay_ms = u64::try_from(mutex_defaults.retry_delay.as_millis()).unwrap_or(u64::MAX);

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            redis_url: get("REDIS_URL"),
            mutex: MutexOptions {
                expiry: Duration::from_secs(expiry_secs),
                retries: parse_or(&get, "MUTEX_RETRIES", mutex_defaults.retries)?,
                retry_delay: Duration::from_millis(parse_or(
                    &get,
                    "MUTEX_RETRY_DELAY_MS",
                    retry_delay_ms,
                )?),
                timeout_factor,
                service_prefix: get("MUTEX_SERVICE_PREFIX"),
            },
            dedup_ttl: Duration::from_secs(dedup_ttl_secs),
            guard: parse_or(&get, "ROCKET_GUARD_POLICY", defaults.guard)?,
        })
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}
