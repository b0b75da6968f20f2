//! Interaction store adapter
//!
//! Read-only boundary between the recommendation core and the durable store
//! holding interaction history and the product catalog.

mod memory;
mod postgres;

pub use memory::InMemoryInteractionStore;
pub use postgres::PostgresInteractionStore;

use crate::error::Result;
use crate::interaction::{Interaction, Product};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Read operations the core consumes
///
/// Every failure is reported as `RecommenderError::StoreUnavailable`.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Full interaction history
    async fn fetch_all_interactions(&self) -> Result<Vec<Interaction>>;

    /// Ids of every catalog product
    async fn fetch_product_ids(&self) -> Result<BTreeSet<String>>;

    /// Ids of the products `user_id` has interacted with
    async fn fetch_interacted_product_ids(&self, user_id: &str) -> Result<BTreeSet<String>>;

    /// Catalog details for `ids`. Unknown ids are skipped; order is unspecified.
    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>>;
}
