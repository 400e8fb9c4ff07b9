//! Server settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `CONTESTS_*` environment variables or a
//! configuration file, in that order of precedence.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use backend::domain::{DEFAULT_MINIMUM_AGE, DEFAULT_OPERATION_DEADLINE};
use backend::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No database URL was configured.
    #[error("database_url is required (set CONTESTS_DATABASE_URL)")]
    MissingDatabaseUrl,
    /// The bind address does not parse.
    #[error("bind_addr {value:?} is not a socket address: {message}")]
    InvalidBindAddr {
        /// Configured value.
        value: String,
        /// Parser error.
        message: String,
    },
    /// A zero operation timeout would fail every registration.
    #[error("operation_timeout_ms must be positive")]
    ZeroTimeout,
}

/// Runtime configuration for the contest service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONTESTS")]
pub struct ServerSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Listen address for the HTTP server.
    pub bind_addr: Option<String>,
    /// Minimum entrant age enforced by the eligibility gate.
    pub minimum_age: Option<u32>,
    /// Deadline for each registration operation, in milliseconds.
    pub operation_timeout_ms: Option<u64>,
    /// Maximum open database connections.
    pub pool_max_size: Option<u32>,
    /// Idle database connections kept warm.
    pub pool_min_idle: Option<u32>,
}

impl ServerSettings {
    /// Configured database URL; blank counts as missing.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Listen address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| {
            SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
                message: err.to_string(),
            }
        })
    }

    /// Minimum entrant age, defaulting to [`DEFAULT_MINIMUM_AGE`].
    pub fn minimum_age(&self) -> u32 {
        self.minimum_age.unwrap_or(DEFAULT_MINIMUM_AGE)
    }

    /// Per-operation deadline, defaulting to [`DEFAULT_OPERATION_DEADLINE`].
    pub fn operation_timeout(&self) -> Result<Duration, SettingsError> {
        match self.operation_timeout_ms {
            None => Ok(DEFAULT_OPERATION_DEADLINE),
            Some(0) => Err(SettingsError::ZeroTimeout),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }

    /// Pool settings derived from the loaded values.
    ///
    /// Connection checkout waits no longer than the operation timeout, so a
    /// starved pool surfaces as a transient failure within the deadline.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        Ok(PoolConfig::new(self.database_url()?)
            .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE))
            .with_min_idle(Some(self.pool_min_idle.unwrap_or(DEFAULT_POOL_MIN_IDLE)))
            .with_connection_timeout(self.operation_timeout()?))
    }
}
