use super::InteractionStore;
use crate::error::{RecommenderError, Result};
use crate::interaction::{Interaction, Product};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory interaction store
///
/// Used by tests and local runs. `set_available(false)` makes every read
/// fail with `StoreUnavailable` to simulate an outage.
#[derive(Default)]
pub struct InMemoryInteractionStore {
    products: RwLock<BTreeMap<String, Product>>,
    interactions: RwLock<Vec<Interaction>>,
    unavailable: AtomicBool,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products<I>(self, products: I) -> Self
    where
        I: IntoIterator<Item = Product>,
    {
        for product in products {
            self.add_product(product);
        }
        self
    }

    /// Register catalog ids with placeholder details
    pub fn with_product_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_products(ids.into_iter().map(|id| {
            let id = id.into();
            Product {
                name: format!("Product {}", id),
                description: String::new(),
                price: 0.0,
                id,
            }
        }))
    }

    pub fn with_interactions<I>(self, interactions: I) -> Self
    where
        I: IntoIterator<Item = Interaction>,
    {
        for interaction in interactions {
            self.record(interaction);
        }
        self
    }

    pub fn add_product(&self, product: Product) {
        self.products.write().insert(product.id.clone(), product);
    }

    pub fn record(&self, interaction: Interaction) {
        self.interactions.write().push(interaction);
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecommenderError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn fetch_all_interactions(&self) -> Result<Vec<Interaction>> {
        self.ensure_available()?;
        Ok(self.interactions.read().clone())
    }

    async fn fetch_product_ids(&self) -> Result<BTreeSet<String>> {
        self.ensure_available()?;
        Ok(self.products.read().keys().cloned().collect())
    }

    async fn fetch_interacted_product_ids(&self, user_id: &str) -> Result<BTreeSet<String>> {
        self.ensure_available()?;
        Ok(self
            .interactions
            .read()
            .iter()
            .filter(|i| i.user_id == user_id)
            .map(|i| i.product_id.clone())
            .collect())
    }

    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>> {
        self.ensure_available()?;
        let products = self.products.read();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::InteractionKind;

    fn store() -> InMemoryInteractionStore {
        InMemoryInteractionStore::new()
            .with_product_ids(["p1", "p2", "p3"])
            .with_interactions([
                Interaction::new("u1", "p1", InteractionKind::Purchase),
                Interaction::new("u1", "p2", InteractionKind::View),
                Interaction::new("u2", "p1", InteractionKind::View),
            ])
    }

    #[tokio::test]
    async fn test_fetch_product_ids() {
        let ids = store().fetch_product_ids().await.unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_fetch_interacted_product_ids() {
        let store = store();
        let ids = store.fetch_interacted_product_ids("u1").await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("p1") && ids.contains("p2"));

        let none = store.fetch_interacted_product_ids("nobody").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_products_skips_unknown_ids() {
        let products = store()
            .fetch_products(&["p2".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p2");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_read() {
        let store = store();
        store.set_available(false);

        assert!(matches!(
            store.fetch_all_interactions().await,
            Err(RecommenderError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.fetch_product_ids().await,
            Err(RecommenderError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.fetch_interacted_product_ids("u1").await,
            Err(RecommenderError::StoreUnavailable(_))
        ));

        store.set_available(true);
        assert_eq!(store.fetch_all_interactions().await.unwrap().len(), 3);
    }
}
