//! Configuration loading for the recommender service
//!
//! Every setting is read from environment variables with the `RECOMMENDER_`
//! prefix. A `.env` file is honoured through dotenvy. Precedence is
//! defaults < .env < process environment.
//!
//! # Example
//!
//! ```no_run
//! use recommender_core::config::{load_dotenv, ConfigLoader, DatabaseConfig, ServiceConfig};
//!
//! # fn example() -> Result<(), recommender_core::CoreError> {
//! load_dotenv();
//!
//! let db_config = DatabaseConfig::from_env()?;
//! let service_config = ServiceConfig::from_env()?;
//!
//! db_config.validate()?;
//! service_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Implemented by every configuration section so the binary can load and
/// validate them uniformly.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, filling defaults for
    /// optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` naming the offending variable.
    fn validate(&self) -> Result<(), CoreError>;

    /// `from_env` followed by `validate`
    fn load() -> Result<Self, CoreError> {
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }
}

/// Database configuration
///
/// # Environment Variables
///
/// - `RECOMMENDER_DATABASE_URL` (required, falls back to `DATABASE_URL`)
/// - `RECOMMENDER_DATABASE_REPLICA_URL` (optional): read replica used for all reads
/// - `RECOMMENDER_DATABASE_MAX_CONNECTIONS` (default: 10)
/// - `RECOMMENDER_DATABASE_MIN_CONNECTIONS` (default: 1)
/// - `RECOMMENDER_DATABASE_CONNECT_TIMEOUT` seconds (default: 30)
/// - `RECOMMENDER_DATABASE_IDLE_TIMEOUT` seconds (default: 600)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Primary PostgreSQL connection URL
    pub url: String,
    /// Read replica URL; reads use the primary when unset
    pub replica_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/recommender".to_string(),
            replica_url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl DatabaseConfig {
    /// URL that read-only queries should connect to
    pub fn read_url(&self) -> &str {
        self.replica_url.as_deref().unwrap_or(&self.url)
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, CoreError> {
        let defaults = DatabaseConfig::default();

        let url = std::env::var("RECOMMENDER_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                CoreError::config(
                    "DATABASE_URL or RECOMMENDER_DATABASE_URL must be set",
                    "RECOMMENDER_DATABASE_URL",
                )
            })?;

        let replica_url = std::env::var("RECOMMENDER_DATABASE_REPLICA_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let max_connections = parse_env_var(
            "RECOMMENDER_DATABASE_MAX_CONNECTIONS",
            defaults.max_connections,
        )?;
        let min_connections = parse_env_var(
            "RECOMMENDER_DATABASE_MIN_CONNECTIONS",
            defaults.min_connections,
        )?;
        let connect_timeout_secs = parse_env_var("RECOMMENDER_DATABASE_CONNECT_TIMEOUT", 30u64)?;
        let idle_timeout_secs = parse_env_var("RECOMMENDER_DATABASE_IDLE_TIMEOUT", 600u64)?;

        Ok(Self {
            url,
            replica_url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            idle_timeout: Duration::from_secs(idle_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        Url::parse(&self.url).map_err(|e| {
            CoreError::config(
                format!("Invalid DATABASE_URL: {}", e),
                "RECOMMENDER_DATABASE_URL",
            )
        })?;

        if let Some(replica) = &self.replica_url {
            Url::parse(replica).map_err(|e| {
                CoreError::config(
                    format!("Invalid replica URL: {}", e),
                    "RECOMMENDER_DATABASE_REPLICA_URL",
                )
            })?;
        }

        if self.max_connections == 0 {
            return Err(CoreError::config(
                "max_connections must be greater than 0",
                "RECOMMENDER_DATABASE_MAX_CONNECTIONS",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(CoreError::config(
                format!(
                    "min_connections ({}) cannot exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                "RECOMMENDER_DATABASE_MIN_CONNECTIONS",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(CoreError::config(
                "connect_timeout must be greater than 0 seconds",
                "RECOMMENDER_DATABASE_CONNECT_TIMEOUT",
            ));
        }

        if self.idle_timeout.as_secs() == 0 {
            return Err(CoreError::config(
                "idle_timeout must be greater than 0 seconds",
                "RECOMMENDER_DATABASE_IDLE_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// HTTP service configuration
///
/// # Environment Variables
///
/// - `RECOMMENDER_SERVICE_HOST` (default: 0.0.0.0, falls back to `HOST`)
/// - `RECOMMENDER_SERVICE_PORT` (default: 50051, falls back to `PORT`)
/// - `RECOMMENDER_SERVICE_WORKERS` (default: number of CPUs)
/// - `RECOMMENDER_SERVICE_LOG_LEVEL` (default: info, falls back to `RUST_LOG`)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
            workers: num_cpus::get(),
            log_level: "info".to_string(),
        }
    }
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, CoreError> {
        let defaults = ServiceConfig::default();

        let host = std::env::var("RECOMMENDER_SERVICE_HOST")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or(defaults.host);

        let port = match std::env::var("RECOMMENDER_SERVICE_PORT") {
            Ok(_) => parse_env_var("RECOMMENDER_SERVICE_PORT", defaults.port)?,
            Err(_) => parse_env_var("PORT", defaults.port)?,
        };

        let workers = parse_env_var("RECOMMENDER_SERVICE_WORKERS", defaults.workers)?;

        let log_level = std::env::var("RECOMMENDER_SERVICE_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(defaults.log_level);

        Ok(Self {
            host,
            port,
            workers,
            log_level,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.port == 0 {
            return Err(CoreError::config(
                "port must be greater than 0",
                "RECOMMENDER_SERVICE_PORT",
            ));
        }

        if self.workers == 0 {
            return Err(CoreError::config(
                "workers must be greater than 0",
                "RECOMMENDER_SERVICE_WORKERS",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(CoreError::config(
                format!(
                    "Invalid log_level '{}'. Must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                "RECOMMENDER_SERVICE_LOG_LEVEL",
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable, returning `default` when it is unset
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value is set but cannot be parsed.
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| CoreError::config(format!("Failed to parse {}: {}", key, e), key))
        })
        .unwrap_or(Ok(default))
}

/// Load `.env` if present
///
/// A missing file is not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
        assert!(config.replica_url.is_none());
    }

    #[test]
    fn test_read_url_prefers_replica() {
        let mut config = DatabaseConfig::default();
        assert_eq!(config.read_url(), "postgresql://localhost/recommender");

        config.replica_url = Some("postgresql://replica/recommender".to_string());
        assert_eq!(config.read_url(), "postgresql://replica/recommender");
    }

    #[test]
    fn test_database_config_from_env() {
        env::set_var("RECOMMENDER_DATABASE_URL", "postgresql://localhost/test");
        env::set_var("RECOMMENDER_DATABASE_MAX_CONNECTIONS", "50");
        env::set_var("RECOMMENDER_DATABASE_MIN_CONNECTIONS", "5");
        env::set_var("RECOMMENDER_DATABASE_REPLICA_URL", "postgresql://replica/test");

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "postgresql://localhost/test");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.read_url(), "postgresql://replica/test");
        assert!(config.validate().is_ok());

        env::remove_var("RECOMMENDER_DATABASE_URL");
        env::remove_var("RECOMMENDER_DATABASE_MAX_CONNECTIONS");
        env::remove_var("RECOMMENDER_DATABASE_MIN_CONNECTIONS");
        env::remove_var("RECOMMENDER_DATABASE_REPLICA_URL");
    }

    #[test]
    fn test_database_config_validation_invalid_url() {
        let config = DatabaseConfig {
            url: "not-a-valid-url".to_string(),
            ..DatabaseConfig::default()
        };

        let result = config.validate();
        assert!(matches!(
            result.unwrap_err(),
            CoreError::ConfigurationError { .. }
        ));
    }

    #[test]
    fn test_database_config_validation_zero_max_connections() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.config_key(), Some("RECOMMENDER_DATABASE_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_database_config_validation_min_exceeds_max() {
        let config = DatabaseConfig {
            min_connections: 30,
            max_connections: 20,
            ..DatabaseConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.config_key(), Some("RECOMMENDER_DATABASE_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 50051);
        assert!(config.workers > 0);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_config_validation_invalid_log_level() {
        let config = ServiceConfig {
            log_level: "verbose".to_string(),
            ..ServiceConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.config_key(), Some("RECOMMENDER_SERVICE_LOG_LEVEL"));
    }

    #[test]
    fn test_service_config_validation_zero_port() {
        let config = ServiceConfig {
            port: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_config_validation_zero_workers() {
        let config = ServiceConfig {
            workers: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_var_with_default() {
        let value: u32 = parse_env_var("RECOMMENDER_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_var_with_value() {
        env::set_var("RECOMMENDER_TEST_PARSE_VALUE", " 100 ");
        let value: u32 = parse_env_var("RECOMMENDER_TEST_PARSE_VALUE", 42).unwrap();
        assert_eq!(value, 100);
        env::remove_var("RECOMMENDER_TEST_PARSE_VALUE");
    }

    #[test]
    fn test_parse_env_var_invalid_value() {
        env::set_var("RECOMMENDER_TEST_PARSE_INVALID", "not-a-number");
        let result: Result<u32, _> = parse_env_var("RECOMMENDER_TEST_PARSE_INVALID", 42);
        let err = result.unwrap_err();
        assert_eq!(err.config_key(), Some("RECOMMENDER_TEST_PARSE_INVALID"));
        env::remove_var("RECOMMENDER_TEST_PARSE_INVALID");
    }
}
