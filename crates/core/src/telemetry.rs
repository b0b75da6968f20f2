//! Structured logging initialization
//!
//! Sets up a `tracing-subscriber` registry with an `EnvFilter` and a fmt
//! layer. Output is JSON when `LOG_FORMAT=json`, human readable otherwise.
//!
//! ```rust,no_run
//! use recommender_core::telemetry::{init_tracing, TracingConfig};
//!
//! fn main() -> Result<(), recommender_core::CoreError> {
//!     init_tracing(&TracingConfig::from_env())?;
//!     Ok(())
//! }
//! ```

use crate::error::CoreError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to the startup record
    pub service_name: String,
    /// Default filter directive used when `RUST_LOG` is unset
    pub default_level: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "recommender-service".to_string(),
            default_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables
    ///
    /// - SERVICE_NAME: service identifier
    /// - LOG_FORMAT: `json` or `pretty`
    /// - RUST_ENV: if "production", defaults to JSON output
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("SERVICE_NAME").unwrap_or_else(|_| "recommender-service".to_string());

        let is_production = std::env::var("RUST_ENV")
            .map(|e| e == "production")
            .unwrap_or(false);

        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(if is_production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            });

        Self {
            service_name,
            default_level: "info".to_string(),
            format,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Initialize the global tracing subscriber
///
/// Must be called once at startup.
///
/// # Errors
///
/// Returns `TelemetryError` if a global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), CoreError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init(),
    };

    result.map_err(|e| CoreError::TelemetryError(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(())
}
