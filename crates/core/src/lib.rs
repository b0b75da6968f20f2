//! # Recommender Core
//!
//! Shared infrastructure for the product recommender service.
//!
//! ## Modules
//!
//! - `config`: environment-driven configuration loading and validation
//! - `database`: PostgreSQL connection pool
//! - `error`: infrastructure error type
//! - `telemetry`: structured logging setup

pub mod config;
pub mod database;
pub mod error;
pub mod telemetry;

pub use config::{load_dotenv, parse_env_var, ConfigLoader, DatabaseConfig, ServiceConfig};
pub use database::{DatabasePool, PoolStats};
pub use error::CoreError;
pub use telemetry::{init_tracing, LogFormat, TracingConfig};

/// Result type alias for infrastructure operations
pub type Result<T> = std::result::Result<T, CoreError>;
