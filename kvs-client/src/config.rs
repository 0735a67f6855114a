//! # Client Configuration
//!
//! Endpoint, key domain and the two static pool limits, with optional socket
//! timeouts and the retry policy. Values come from code or from `KVS_*`
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::retry::RetryPolicy;

/// Default idle-connection ceiling.
pub const DEFAULT_MAX_IDLE: usize = 80;

/// Default active-connection ceiling (idle + in use).
pub const DEFAULT_MAX_ACTIVE: usize = 12_000;

/// Default endpoint used by `from_env` when `KVS_ADDR` is unset.
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Configuration for `KeyValueClient` and its pool.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Prefix prepended to every key.
    pub domain: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_active: usize,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Retry policy for transient transport failures.
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            addr: DEFAULT_ADDR.to_string(),
            domain: String::new(),
            max_idle: DEFAULT_MAX_IDLE,
            max_active: DEFAULT_MAX_ACTIVE,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for `addr` and `domain` with default limits.
    pub fn new(addr: impl Into<String>, domain: impl Into<String>) -> Self {
        StoreConfig {
            addr: addr.into(),
            domain: domain.into(),
            ..StoreConfig::default()
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// Recognised variables: `KVS_ADDR`, `KVS_DOMAIN`, `KVS_MAX_IDLE`,
    /// `KVS_MAX_ACTIVE`, `KVS_RETRY_ATTEMPTS`. Missing variables keep their
    /// defaults.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = StoreConfig::default();
        if let Some(addr) = lookup("KVS_ADDR") {
            config.addr = addr;
        }
        if let Some(domain) = lookup("KVS_DOMAIN") {
            config.domain = domain;
        }
        if let Some(raw) = lookup("KVS_MAX_IDLE") {
            config.max_idle = parse_var("KVS_MAX_IDLE", &raw)?;
        }
        if let Some(raw) = lookup("KVS_MAX_ACTIVE") {
            config.max_active = parse_var("KVS_MAX_ACTIVE", &raw)?;
        }
        if let Some(raw) = lookup("KVS_RETRY_ATTEMPTS") {
            config.retry.max_retries = parse_var("KVS_RETRY_ATTEMPTS", &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the pool limits.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_active == 0 {
            return Err(StoreError::Config("max_active must be at least 1".to_string()));
        }
        if self.max_idle > self.max_active {
            return Err(StoreError::Config(format!(
                "max_idle ({}) exceeds max_active ({})",
                self.max_idle, self.max_active
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> StoreResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::Config(format!("{name} is not a valid number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_use_static_limits() {
        let config = StoreConfig::new("10.0.0.1:6379", "app:");
        assert_eq!(config.max_idle, 80);
        assert_eq!(config.max_active, 12_000);
        assert_eq!(config.domain, "app:");
        assert!(config.read_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("KVS_ADDR", "redis.internal:6380"),
            ("KVS_DOMAIN", "session:"),
            ("KVS_MAX_IDLE", "4"),
            ("KVS_MAX_ACTIVE", "16"),
            ("KVS_RETRY_ATTEMPTS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "redis.internal:6380");
        assert_eq!(config.domain, "session:");
        assert_eq!(config.max_idle, 4);
        assert_eq!(config.max_active, 16);
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn env_rejects_bad_numbers() {
        let err = StoreConfig::from_lookup(lookup_from(&[("KVS_MAX_IDLE", "lots")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn idle_above_active_is_invalid() {
        let mut config = StoreConfig::default();
        config.max_idle = 10;
        config.max_active = 2;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        config.max_active = 0;
        config.max_idle = 0;
        assert!(config.validate().is_err());
    }
}
