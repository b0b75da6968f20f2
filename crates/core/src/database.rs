//! PostgreSQL connection pool for the recommender service

use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};
use tracing::info;

/// Shared database connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect to the primary database
    pub async fn new(config: &DatabaseConfig) -> Result<Self, SqlxError> {
        Self::connect(config, &config.url).await
    }

    /// Connect to the read replica, or the primary when no replica is configured
    pub async fn read_replica(config: &DatabaseConfig) -> Result<Self, SqlxError> {
        Self::connect(config, config.read_url()).await
    }

    async fn connect(config: &DatabaseConfig, url: &str) -> Result<Self, SqlxError> {
        info!(
            max_connections = config.max_connections,
            replica = config.replica_url.is_some(),
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(config.connect_timeout)
            .connect(url)
            .await?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if pool is healthy
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}
