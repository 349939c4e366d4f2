//! Scanner configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SCANNER_HOST` - Bind address (default: 127.0.0.1)
//! - `SCANNER_PORT` - Listen port (default: 8001)
//! - `SCANNER_REDEEM_URL` - Canteen redemption endpoint
//!   (default: <http://localhost:8000/api/redeem-ticket/>)
//! - `SCANNER_TIMEOUT_SECS` - Upstream request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default redemption endpoint of a co-located canteen.
pub const DEFAULT_REDEEM_URL: &str = "http://localhost:8000/api/redeem-ticket/";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Scanner application configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Canteen redemption endpoint
    pub redeem_url: Url,
    /// Upstream request timeout
    pub timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ScannerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_var(&var, "SCANNER_HOST", "127.0.0.1")?;
        let port = parse_var(&var, "SCANNER_PORT", "8001")?;
        let redeem_url: Url = parse_var(&var, "SCANNER_REDEEM_URL", DEFAULT_REDEEM_URL)?;
        if !matches!(redeem_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "SCANNER_REDEEM_URL".to_string(),
                format!("unsupported scheme {}", redeem_url.scheme()),
            ));
        }
        let timeout_secs: u64 = parse_var(&var, "SCANNER_TIMEOUT_SECS", "10")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SCANNER_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            redeem_url,
            timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: var("SENTRY_DSN"),
            sentry_environment: var("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse a variable, falling back to a default when unset.
fn parse_var<T, F>(var: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .unwrap_or_else(|| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
