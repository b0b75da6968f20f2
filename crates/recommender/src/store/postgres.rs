use super::InteractionStore;
use crate::error::Result;
use crate::interaction::{Interaction, InteractionKind, Product};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recommender_core::DatabasePool;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use tracing::debug;

/// PostgreSQL implementation of `InteractionStore`
///
/// Expects the `products` and `interactions` tables:
///
/// ```sql
/// CREATE TABLE products (
///     id TEXT PRIMARY KEY,
///     name TEXT,
///     description TEXT,
///     price DOUBLE PRECISION,
///     account_id INTEGER
/// );
///
/// CREATE TABLE interactions (
///     id SERIAL PRIMARY KEY,
///     user_id TEXT,
///     product_id TEXT,
///     interaction_type TEXT,
///     timestamp TIMESTAMP DEFAULT NOW()
/// );
/// ```
pub struct PostgresInteractionStore {
    pool: PgPool,
}

impl PostgresInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &DatabasePool) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl InteractionStore for PostgresInteractionStore {
    async fn fetch_all_interactions(&self) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT
                user_id,
                product_id,
                interaction_type,
                COALESCE("timestamp"::timestamptz, NOW()) AS occurred_at
            FROM interactions
            WHERE user_id IS NOT NULL AND product_id IS NOT NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut interactions = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: Option<String> = row.try_get("interaction_type")?;
            let timestamp: DateTime<Utc> = row.try_get("occurred_at")?;

            interactions.push(Interaction {
                user_id: row.try_get("user_id")?,
                product_id: row.try_get("product_id")?,
                kind: InteractionKind::parse(kind.as_deref().unwrap_or_default()),
                timestamp,
            });
        }

        debug!(count = interactions.len(), "Fetched interaction history");
        Ok(interactions)
    }

    async fn fetch_product_ids(&self) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT id FROM products")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }

    async fn fetch_interacted_product_ids(&self, user_id: &str) -> Result<BTreeSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT product_id
            FROM interactions
            WHERE user_id = $1 AND product_id IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("product_id").map_err(Into::into))
            .collect()
    }

    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let name: Option<String> = row.try_get("name")?;
            let description: Option<String> = row.try_get("description")?;
            let price: Option<f64> = row.try_get("price")?;

            products.push(Product {
                id: row.try_get("id")?,
                name: name.unwrap_or_default(),
                description: description.unwrap_or_default(),
                price: price.unwrap_or_default(),
            });
        }

        Ok(products)
    }
}
