//! Serving facade
//!
//! `RecommendationService` is the single entry point used by the HTTP layer
//! and the retrain task. It owns the published model and wires the store,
//! rating transform and ranker together.

use crate::config::RecommenderConfig;
use crate::error::{RecommenderError, Result};
use crate::interaction::Product;
use crate::model::{FactorizationModel, ModelStatus, TrainingReport};
use crate::ranker::{CandidateRanker, ScoredProduct};
use crate::rating::RatingTransform;
use crate::store::InteractionStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Longest accepted user or product id, in bytes
pub const MAX_ID_LEN: usize = 256;

/// Reject empty, oversized or control-character ids
pub fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RecommenderError::InvalidRequest(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.len() > MAX_ID_LEN {
        return Err(RecommenderError::InvalidRequest(format!(
            "{} exceeds {} bytes",
            field, MAX_ID_LEN
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(RecommenderError::InvalidRequest(format!(
            "{} contains control characters",
            field
        )));
    }
    Ok(())
}

pub struct RecommendationService {
    store: Arc<dyn InteractionStore>,
    model: Arc<FactorizationModel>,
    transform: RatingTransform,
    ranker: CandidateRanker,
    /// Held for a whole training pass, store read through publish
    training: Mutex<()>,
    default_top_n: usize,
    max_top_n: usize,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn InteractionStore>, config: &RecommenderConfig) -> Self {
        Self {
            ranker: CandidateRanker::new(store.clone()),
            model: Arc::new(FactorizationModel::new(config.model.clone())),
            transform: config.rating_transform(),
            training: Mutex::new(()),
            default_top_n: config.default_top_n,
            max_top_n: config.max_top_n,
            store,
        }
    }

    pub fn model(&self) -> &Arc<FactorizationModel> {
        &self.model
    }

    pub fn default_top_n(&self) -> usize {
        self.default_top_n
    }

    /// Largest page the HTTP layer will ask for
    pub fn max_top_n(&self) -> usize {
        self.max_top_n
    }

    /// Top `top_n` product ids for `user_id`, best first
    ///
    /// Read-only: never touches the published model.
    pub async fn recommend(&self, user_id: &str, top_n: usize) -> Result<Vec<String>> {
        self.recommend_page(user_id, 0, top_n).await
    }

    /// Positions `[skip, skip + take)` of the user's full ranking
    pub async fn recommend_page(
        &self,
        user_id: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<String>> {
        validate_id("user_id", user_id)?;
        validate_take(take)?;

        let model = self.model.require_snapshot()?;
        let ranked = self.ranker.rank_page(&model, user_id, skip, take).await?;

        debug!(user_id, skip, take, returned = ranked.len(), "Ranked recommendations");
        Ok(into_ids(ranked))
    }

    /// Like `recommend_page`, resolved to product details in ranking order
    pub async fn recommend_products(
        &self,
        user_id: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Product>> {
        let ids = self.recommend_page(user_id, skip, take).await?;
        self.product_details(&ids).await
    }

    /// Products most similar to the viewed ones, excluding the viewed ones
    pub async fn recommend_for_viewed(
        &self,
        viewed_ids: &[String],
        skip: usize,
        take: usize,
    ) -> Result<Vec<String>> {
        if viewed_ids.is_empty() {
            return Err(RecommenderError::InvalidRequest(
                "at least one viewed product id is required".to_string(),
            ));
        }
        for id in viewed_ids {
            validate_id("product_id", id)?;
        }
        validate_take(take)?;

        let model = self.model.require_snapshot()?;
        let viewed: BTreeSet<String> = viewed_ids.iter().cloned().collect();
        let ranked = self.ranker.rank_similar(&model, &viewed, skip, take).await?;

        Ok(into_ids(ranked))
    }

    /// Product details for `ids`, in the order given
    ///
    /// Ids with no catalog row are skipped.
    pub async fn product_details(&self, ids: &[String]) -> Result<Vec<Product>> {
        let mut by_id: HashMap<String, Product> = self
            .store
            .fetch_products(ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Full retrain from the store's current interaction history
    ///
    /// Passes are serialized end to end, so a pass never publishes over one
    /// that read newer history. A store failure aborts the pass before the
    /// solver runs, leaving the previously published model in place.
    pub async fn train(&self) -> Result<TrainingReport> {
        let _pass = self.training.lock().await;

        let interactions = self.store.fetch_all_interactions().await.map_err(|e| {
            warn!(error = %e, "Could not read interactions; keeping previous model");
            e
        })?;

        let training_set = self.transform.build_training_set(&interactions);
        info!(
            interactions = interactions.len(),
            ratings = training_set.len(),
            "Starting training pass"
        );

        let model = self.model.clone();
        tokio::task::spawn_blocking(move || model.train(training_set)).await?
    }

    pub fn status(&self) -> ModelStatus {
        self.model.status()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_trained()
    }
}

fn validate_take(take: usize) -> Result<()> {
    if take == 0 {
        return Err(RecommenderError::InvalidRequest(
            "requested count must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn into_ids(ranked: Vec<ScoredProduct>) -> Vec<String> {
    ranked.into_iter().map(|s| s.product_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_accepts_ordinary_ids() {
        assert!(validate_id("user_id", "u1").is_ok());
        assert!(validate_id("user_id", "user@example.com").is_ok());
        assert!(validate_id("user_id", &"a".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn test_validate_id_rejects_bad_ids() {
        for bad in ["", "   ", "u1\n", "u\u{0}1"] {
            assert!(matches!(
                validate_id("user_id", bad),
                Err(RecommenderError::InvalidRequest(_))
            ));
        }

        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(validate_id("user_id", &long).is_err());
    }
}
