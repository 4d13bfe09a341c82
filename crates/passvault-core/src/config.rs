//! Client configuration for `passvault`.
//!
//! Loads configuration from environment variables. The encryption key and
//! the API base address have no defaults and must be supplied.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use passvault_remote::HttpCollectionConfig;

use crate::error::ConfigError;

pub const DEFAULT_SESSION_FILE: &str = ".passvault/session.json";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Client configuration.
#[derive(Clone)]
pub struct VaultConfig {
    /// API base address; the collection lives at `{api_url}/vault`.
    pub api_url: String,
    /// Secret the record field key is derived from. Never logged.
    pub encryption_key: String,
    /// Where the session token and user id are kept.
    pub session_file: PathBuf,
    /// Log filter (e.g. `warn`, `debug`, `passvault_core=trace`).
    pub log_level: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry attempts for idempotent requests.
    pub max_retries: u32,
}

impl VaultConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `PASSVAULT_API_URL`: API base address (required)
    /// - `PASSVAULT_ENCRYPTION_KEY`: record encryption secret (required)
    /// - `PASSVAULT_SESSION_FILE`: session file (default: `.passvault/session.json`)
    /// - `PASSVAULT_LOG_LEVEL`: log filter (default: `warn`)
    /// - `PASSVAULT_TIMEOUT_SECS`: request timeout (default: `10`)
    /// - `PASSVAULT_MAX_RETRIES`: retries for idempotent calls (default: `2`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Invalid`] for an unparseable number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = get("PASSVAULT_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .ok_or(ConfigError::Missing {
                name: "PASSVAULT_API_URL",
            })?;

        let encryption_key = get("PASSVAULT_ENCRYPTION_KEY").ok_or(ConfigError::Missing {
            name: "PASSVAULT_ENCRYPTION_KEY",
        })?;

        let session_file = get("PASSVAULT_SESSION_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from);

        let log_level = get("PASSVAULT_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());

        let timeout_secs = match get("PASSVAULT_TIMEOUT_SECS") {
            Some(v) => parse_number("PASSVAULT_TIMEOUT_SECS", &v)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_retries = match get("PASSVAULT_MAX_RETRIES") {
            Some(v) => parse_number("PASSVAULT_MAX_RETRIES", &v)?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            api_url,
            encryption_key,
            session_file,
            log_level,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
        })
    }

    /// Settings for the HTTP collection client.
    #[must_use]
    pub fn collection_config(&self) -> HttpCollectionConfig {
        HttpCollectionConfig {
            timeout: self.timeout,
            max_retries: self.max_retries,
            ..HttpCollectionConfig::new(self.api_url.clone())
        }
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("api_url", &self.api_url)
            .field("encryption_key", &"[REDACTED]")
            .field("session_file", &self.session_file)
            .field("log_level", &self.log_level)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_owned(),
    })
}
