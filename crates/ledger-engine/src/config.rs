//! # Ledger Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Environment Variables
//! ```text
//! ┌──────────────────────────────┬──────────────┬─────────────────────────┐
//! │ variable                     │ default      │ meaning                 │
//! ├──────────────────────────────┼──────────────┼─────────────────────────┤
//! │ LEDGER_DATABASE_PATH         │ ./ledger.db  │ SQLite file             │
//! │ LEDGER_INVOICE_PREFIX        │ FE           │ invoice series prefix   │
//! │ LEDGER_DB_MAX_CONNECTIONS    │ 5            │ pool size               │
//! │ LEDGER_DB_BUSY_TIMEOUT_MS    │ 5000         │ write-lock wait         │
//! │ LEDGER_NUMBER_RETRIES        │ 1            │ re-derivations on clash │
//! │ LEDGER_STORAGE_RETRIES       │ 3            │ retries on busy storage │
//! │ LEDGER_RETRY_BACKOFF_MS      │ 50           │ first retry delay       │
//! └──────────────────────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! Read-only after initialization.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ledger_core::validation::validate_invoice_prefix;
use ledger_core::DEFAULT_INVOICE_PREFIX;
use ledger_db::DbConfig;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    pub invoice_prefix: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Extra attempts after an invoice number collision.
    pub number_retries: u32,
    /// Extra attempts after a transient storage fault.
    pub storage_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./ledger.db"),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5_000),
            number_retries: 1,
            storage_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl LedgerConfig {
    /// Loads `LEDGER_*` variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with another database file used
    /// when `LEDGER_DATABASE_PATH` is unset.
    pub fn from_env_or(default_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup_or(|key| std::env::var(key).ok(), default_path)
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_or(lookup, LedgerConfig::default().database_path)
    }

    /// Same as [`from_env_or`](Self::from_env_or) with an arbitrary source.
    pub fn from_lookup_or<F>(lookup: F, default_path: impl Into<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LedgerConfig {
            database_path: default_path.into(),
            ..LedgerConfig::default()
        };

        if let Some(path) = lookup("LEDGER_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(prefix) = lookup("LEDGER_INVOICE_PREFIX") {
            validate_invoice_prefix(&prefix).map_err(|e| ConfigError::InvalidValue {
                key: "LEDGER_INVOICE_PREFIX",
                value: prefix.clone(),
                reason: e.to_string(),
            })?;
            config.invoice_prefix = prefix;
        }

        if let Some(max) = parse::<u32>(&lookup, "LEDGER_DB_MAX_CONNECTIONS")? {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "LEDGER_DB_MAX_CONNECTIONS",
                    value: max.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.max_connections = max;
        }

        if let Some(ms) = parse::<u64>(&lookup, "LEDGER_DB_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(n) = parse::<u32>(&lookup, "LEDGER_NUMBER_RETRIES")? {
            config.number_retries = n;
        }

        if let Some(n) = parse::<u32>(&lookup, "LEDGER_STORAGE_RETRIES")? {
            config.storage_retries = n;
        }

        if let Some(ms) = parse::<u64>(&lookup, "LEDGER_RETRY_BACKOFF_MS")? {
            config.retry_backoff = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Pool settings for ledger-db.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }

    /// Retry settings for transient storage faults.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.storage_retries,
            initial_backoff: self.retry_backoff,
            ..RetryPolicy::default()
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.invoice_prefix, "FE");
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.number_retries, 1);
        assert_eq!(config.storage_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("LEDGER_DATABASE_PATH", "/tmp/billing.db"),
            ("LEDGER_INVOICE_PREFIX", "INV"),
            ("LEDGER_DB_BUSY_TIMEOUT_MS", "250"),
            ("LEDGER_STORAGE_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/billing.db"));
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.retry_policy().max_retries, 0);
        assert_eq!(config.db_config().busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("LEDGER_DB_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("LEDGER_DB_MAX_CONNECTIONS"));

        assert!(LedgerConfig::from_lookup(lookup_from(&[("LEDGER_DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(LedgerConfig::from_lookup(lookup_from(&[("LEDGER_INVOICE_PREFIX", "fe-")])).is_err());
    }

    #[test]
    fn test_fallback_path_only_when_unset() {
        let config = LedgerConfig::from_lookup_or(|_| None, "./ledger_dev.db").unwrap();
        assert_eq!(config.database_path, PathBuf::from("./ledger_dev.db"));

        let config = LedgerConfig::from_lookup_or(
            lookup_from(&[("LEDGER_DATABASE_PATH", "/srv/ledger.db")]),
            "./ledger_dev.db",
        )
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/ledger.db"));
    }
}
