//! Candidate ranking
//!
//! The candidate set is recomputed on every call from fresh store reads:
//! every catalog product the user has not interacted with. Candidates are
//! ordered by descending score with ties broken by ascending product id, which
//! makes the ordering total and therefore stable across runs.

use crate::error::Result;
use crate::model::TrainedModel;
use crate::store::InteractionStore;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Product id with its ranking score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProduct {
    pub product_id: String,
    pub score: f32,
}

impl ScoredProduct {
    pub fn new(product_id: impl Into<String>, score: f32) -> Self {
        Self {
            product_id: product_id.into(),
            score,
        }
    }
}

/// Descending score, then ascending product id
fn ranking_order(a: &ScoredProduct, b: &ScoredProduct) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.product_id.cmp(&b.product_id))
}

/// Catalog ids minus interacted ids, in ascending id order
pub fn candidate_set(catalog: &BTreeSet<String>, excluded: &BTreeSet<String>) -> Vec<String> {
    catalog.difference(excluded).cloned().collect()
}

/// Order `scored` and return the window `[skip, skip + take)`
pub fn select_window(
    mut scored: Vec<ScoredProduct>,
    skip: usize,
    take: usize,
) -> Vec<ScoredProduct> {
    let end = skip.saturating_add(take);
    if skip >= scored.len() || take == 0 {
        return Vec::new();
    }

    if end < scored.len() {
        scored.select_nth_unstable_by(end, ranking_order);
        scored.truncate(end);
    }
    scored.sort_by(ranking_order);
    scored.split_off(skip)
}

/// Ranks unseen catalog products for a user
pub struct CandidateRanker {
    store: Arc<dyn InteractionStore>,
}

impl CandidateRanker {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self { store }
    }

    /// Top `top_n` candidates for `user_id`
    pub async fn rank(
        &self,
        model: &TrainedModel,
        user_id: &str,
        top_n: usize,
    ) -> Result<Vec<ScoredProduct>> {
        self.rank_page(model, user_id, 0, top_n).await
    }

    /// Candidates at positions `[skip, skip + take)` of the full ranking
    pub async fn rank_page(
        &self,
        model: &TrainedModel,
        user_id: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<ScoredProduct>> {
        let catalog = self.store.fetch_product_ids().await?;
        let interacted = self.store.fetch_interacted_product_ids(user_id).await?;

        let candidates = candidate_set(&catalog, &interacted);
        debug!(
            user_id,
            catalog = catalog.len(),
            interacted = interacted.len(),
            candidates = candidates.len(),
            "Computed candidate set"
        );

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let scored = candidates
            .into_iter()
            .map(|product_id| {
                let score = model.predict(user_id, &product_id);
                ScoredProduct { product_id, score }
            })
            .collect();

        Ok(select_window(scored, skip, take))
    }

    /// Rank catalog products by similarity to a set of viewed products
    ///
    /// Each candidate scores the mean cosine similarity between its latent
    /// factors and those of the viewed products. Viewed products are never
    /// returned.
    pub async fn rank_similar(
        &self,
        model: &TrainedModel,
        viewed: &BTreeSet<String>,
        skip: usize,
        take: usize,
    ) -> Result<Vec<ScoredProduct>> {
        let catalog = self.store.fetch_product_ids().await?;
        let candidates = candidate_set(&catalog, viewed);

        if candidates.is_empty() || viewed.is_empty() {
            return Ok(Vec::new());
        }

        let scored = candidates
            .into_iter()
            .map(|product_id| {
                let total: f32 = viewed
                    .iter()
                    .map(|seen| model.item_similarity(&product_id, seen))
                    .sum();
                let score = total / viewed.len() as f32;
                ScoredProduct { product_id, score }
            })
            .collect();

        Ok(select_window(scored, skip, take))
    }
}
