//! Error types shared by the recommender service crates

use thiserror::Error;

/// Errors raised by the shared infrastructure layer
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration value is missing, unparsable or out of range
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        /// Environment variable the error refers to, if any
        key: Option<String>,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}

impl CoreError {
    /// Build a configuration error bound to an environment variable
    pub fn config(message: impl Into<String>, key: &str) -> Self {
        CoreError::ConfigurationError {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Environment variable associated with a configuration error
    pub fn config_key(&self) -> Option<&str> {
        match self {
            CoreError::ConfigurationError { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
