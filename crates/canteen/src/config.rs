//! Canteen configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CANTEEN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CANTEEN_HOST` - Bind address (default: 127.0.0.1)
//! - `CANTEEN_PORT` - Listen port (default: 8000)
//! - `CANTEEN_BASE_URL` - Public URL; `https` enables secure cookies (default: <http://localhost:8000>)
//! - `TICKET_EC_LEVEL` - QR error correction, one of L/M/Q/H (default: M)
//! - `TICKET_MODULE_SIZE` - Pixels per QR module (default: 10)
//! - `TICKET_BORDER` - Quiet zone in modules (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use crate::ticket::{TicketConfig, parse_ec_level};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Canteen application configuration.
#[derive(Debug, Clone)]
pub struct CanteenConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the canteen
    pub base_url: String,
    /// Ticket rendering parameters
    pub ticket: TicketConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl CanteenConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = var("CANTEEN_DATABASE_URL")
            .or_else(|| var("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CANTEEN_DATABASE_URL".to_string()))?;

        let host = parse_var(&var, "CANTEEN_HOST", "127.0.0.1")?;
        let port = parse_var(&var, "CANTEEN_PORT", "8000")?;
        let base_url =
            var("CANTEEN_BASE_URL").unwrap_or_else(|| "http://localhost:8000".to_string());

        let ec_raw = var("TICKET_EC_LEVEL").unwrap_or_else(|| "M".to_string());
        let ec_level = parse_ec_level(&ec_raw).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "TICKET_EC_LEVEL".to_string(),
                format!("expected one of L, M, Q, H (got {ec_raw})"),
            )
        })?;
        let module_size: u32 = parse_var(&var, "TICKET_MODULE_SIZE", "10")?;
        if module_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TICKET_MODULE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let border = parse_var(&var, "TICKET_BORDER", "5")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            ticket: TicketConfig {
                ec_level,
                module_size,
                border,
            },
            sentry_dsn: var("SENTRY_DSN"),
            sentry_environment: var("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use qrcode::EcLevel;
    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CanteenConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CanteenConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CANTEEN_DATABASE_URL", "postgres://localhost/qb")]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.ticket, TicketConfig::default());
        assert!(!config.secure_cookies());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fly/qb")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/qb");

        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_ticket_settings() {
        let config = load(&[
            ("CANTEEN_DATABASE_URL", "postgres://localhost/qb"),
            ("TICKET_EC_LEVEL", "h"),
            ("TICKET_MODULE_SIZE", "4"),
            ("TICKET_BORDER", "2"),
        ])
        .unwrap();
        assert_eq!(config.ticket.ec_level, EcLevel::H);
        assert_eq!(config.ticket.module_size, 4);
        assert_eq!(config.ticket.border, 2);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("TICKET_EC_LEVEL", "Z"),
            ("TICKET_MODULE_SIZE", "0"),
            ("CANTEEN_PORT", "eighty"),
        ] {
            let result = load(&[("CANTEEN_DATABASE_URL", "postgres://localhost/qb"), (key, value)]);
            assert!(
                matches!(result, Err(ConfigError::InvalidEnvVar(ref k, _)) if k == key),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let config = load(&[
            ("CANTEEN_DATABASE_URL", "postgres://localhost/qb"),
            ("CANTEEN_BASE_URL", "https://canteen.example.edu"),
        ])
        .unwrap();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("CANTEEN_DATABASE_URL", "postgres://user:hunter2@db/qb")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
