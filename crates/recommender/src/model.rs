//! Factorization model state and snapshot publication
//!
//! `FactorizationModel` starts Untrained and becomes Trained after the first
//! successful `train`. Every training pass builds a fresh `TrainedModel` off
//! to the side and publishes it with a single pointer swap. Readers hold an
//! `Arc` to the snapshot they started with, so an in-flight request never
//! observes a half-trained model, and a failed pass leaves the previous
//! snapshot in place.

use crate::error::{RecommenderError, Result};
use crate::matrix_factorization::{FactorizationConfig, MatrixFactorization, Solver};
use crate::rating::{RatingScale, TrainingSet};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Configuration fixed at construction
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub factorization: FactorizationConfig,
    /// Must match the scale the training set was produced on
    pub scale: RatingScale,
}

/// Summary of one training pass
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingReport {
    pub users: usize,
    pub products: usize,
    pub ratings: usize,
    /// Training RMSE; absent when the training set was empty
    pub rmse: Option<f32>,
    pub solver: String,
    pub duration_ms: u64,
    pub trained_at: DateTime<Utc>,
}

/// Current model state as exposed to operators
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub last_training: Option<TrainingReport>,
}

/// Immutable trained model snapshot
pub struct TrainedModel {
    factorization: MatrixFactorization,
    scale: RatingScale,
    fallback_score: f32,
    product_ids: BTreeSet<String>,
    report: TrainingReport,
}

impl TrainedModel {
    /// Estimated preference of `user_id` for `product_id`
    ///
    /// Returns the fallback score when either id was absent from the
    /// training set.
    pub fn predict(&self, user_id: &str, product_id: &str) -> f32 {
        self.factorization
            .predict(user_id, product_id)
            .map(|score| self.scale.clamp(score))
            .unwrap_or(self.fallback_score)
    }

    /// Score used for users or products unseen at training time: the global
    /// mean rating, or the scale midpoint when the training set was empty
    pub fn fallback_score(&self) -> f32 {
        self.fallback_score
    }

    /// Cosine similarity of two products' latent factors; 0.0 if either is unknown
    pub fn item_similarity(&self, a: &str, b: &str) -> f32 {
        match (
            self.factorization.get_item_embedding(a),
            self.factorization.get_item_embedding(b),
        ) {
            (Some(a), Some(b)) => MatrixFactorization::cosine_similarity(&a, &b),
            _ => 0.0,
        }
    }

    pub fn knows_user(&self, user_id: &str) -> bool {
        self.factorization.users.get(user_id).is_some()
    }

    pub fn knows_product(&self, product_id: &str) -> bool {
        self.product_ids.contains(product_id)
    }

    /// Product ids present in the training set
    pub fn product_ids(&self) -> &BTreeSet<String> {
        &self.product_ids
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}

/// Owner of the currently published model
pub struct FactorizationModel {
    config: ModelConfig,
    current: RwLock<Option<Arc<TrainedModel>>>,
    training: Mutex<()>,
}

impl FactorizationModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            training: Mutex::new(()),
        }
    }

    /// Full retrain on `training_set`
    ///
    /// Training passes are serialized. Readers are not blocked except for the
    /// final swap. On error nothing is published.
    pub fn train(&self, training_set: TrainingSet) -> Result<TrainingReport> {
        let _guard = self.training.lock();
        let started = Instant::now();

        let mut factorization = MatrixFactorization::new(self.config.factorization.clone());
        let matrix = factorization.build_matrix(training_set.ratings());
        let rmse = factorization.fit(&matrix).map_err(|e| {
            warn!(error = %e, "Training pass failed; keeping previous model");
            e
        })?;

        let fallback_score = self.config.scale.clamp(
            factorization
                .global_mean()
                .unwrap_or_else(|| self.config.scale.midpoint()),
        );

        let report = TrainingReport {
            users: factorization.users.len(),
            products: factorization.items.len(),
            ratings: training_set.len(),
            rmse,
            solver: match self.config.factorization.solver {
                Solver::Sgd => "sgd".to_string(),
                Solver::Als => "als".to_string(),
            },
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            trained_at: Utc::now(),
        };

        let product_ids = factorization.items.ids().map(str::to_string).collect();
        let model = TrainedModel {
            factorization,
            scale: self.config.scale,
            fallback_score,
            product_ids,
            report: report.clone(),
        };

        *self.current.write() = Some(Arc::new(model));

        info!(
            users = report.users,
            products = report.products,
            ratings = report.ratings,
            rmse = ?report.rmse,
            duration_ms = report.duration_ms,
            "Published trained model"
        );

        Ok(report)
    }

    /// Currently published model, if any
    pub fn snapshot(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().clone()
    }

    /// Like `snapshot`, failing with `ModelNotReady` while Untrained
    pub fn require_snapshot(&self) -> Result<Arc<TrainedModel>> {
        self.snapshot().ok_or(RecommenderError::ModelNotReady)
    }

    pub fn predict(&self, user_id: &str, product_id: &str) -> Result<f32> {
        Ok(self.require_snapshot()?.predict(user_id, product_id))
    }

    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn status(&self) -> ModelStatus {
        let snapshot = self.snapshot();
        ModelStatus {
            trained: snapshot.is_some(),
            last_training: snapshot.map(|m| m.report().clone()),
        }
    }
}
