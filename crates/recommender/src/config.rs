use crate::interaction::InteractionKind;
use crate::matrix_factorization::{FactorizationConfig, Solver};
use crate::model::ModelConfig;
use crate::rating::{RatingScale, RatingTransform};
use recommender_core::{parse_env_var, ConfigLoader, CoreError};
use std::time::Duration;

/// Recommendation engine configuration
///
/// # Environment Variables
///
/// - `RECOMMENDER_MODEL_FACTORS` (default: 50)
/// - `RECOMMENDER_MODEL_SEED` (default: 42)
/// - `RECOMMENDER_MODEL_EPOCHS` (default: 20)
/// - `RECOMMENDER_MODEL_LEARNING_RATE` (default: 0.005)
/// - `RECOMMENDER_MODEL_REGULARIZATION` (default: 0.02)
/// - `RECOMMENDER_MODEL_SOLVER`: `sgd` or `als` (default: sgd)
/// - `RECOMMENDER_RATING_MIN` / `RECOMMENDER_RATING_MAX` (default: 1.0 / 3.0)
/// - `RECOMMENDER_POSITIVE_KINDS`: comma separated (default: purchase)
/// - `RECOMMENDER_DEFAULT_TOP_N` (default: 5)
/// - `RECOMMENDER_MAX_TOP_N` (default: 100)
/// - `RECOMMENDER_RETRAIN_INTERVAL_SECS`: 0 disables periodic retraining (default: 0)
/// - `RECOMMENDER_TRAIN_ON_STARTUP` (default: true)
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub model: ModelConfig,
    /// Interaction kinds rated at the top of the scale
    pub positive_kinds: Vec<InteractionKind>,
    pub default_top_n: usize,
    pub max_top_n: usize,
    pub retrain_interval: Option<Duration>,
    pub train_on_startup: bool,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            positive_kinds: vec![InteractionKind::Purchase],
            default_top_n: 5,
            max_top_n: 100,
            retrain_interval: None,
            train_on_startup: true,
        }
    }
}

impl RecommenderConfig {
    /// Rating transform sharing the model's scale
    pub fn rating_transform(&self) -> RatingTransform {
        RatingTransform::new(self.model.scale).with_positive_kinds(self.positive_kinds.clone())
    }
}

fn parse_kinds(raw: &str) -> Vec<InteractionKind> {
    raw.split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(InteractionKind::parse)
        .collect()
}

impl ConfigLoader for RecommenderConfig {
    fn from_env() -> Result<Self, CoreError> {
        let defaults = RecommenderConfig::default();
        let fd = FactorizationConfig::default();
        let scale_defaults = RatingScale::default();

        let solver = std::env::var("RECOMMENDER_MODEL_SOLVER")
            .ok()
            .map(|raw| {
                raw.parse::<Solver>()
                    .map_err(|e| CoreError::config(e, "RECOMMENDER_MODEL_SOLVER"))
            })
            .transpose()?
            .unwrap_or(fd.solver);

        let factorization = FactorizationConfig {
            latent_factors: parse_env_var("RECOMMENDER_MODEL_FACTORS", fd.latent_factors)?,
            epochs: parse_env_var("RECOMMENDER_MODEL_EPOCHS", fd.epochs)?,
            learning_rate: parse_env_var("RECOMMENDER_MODEL_LEARNING_RATE", fd.learning_rate)?,
            regularization: parse_env_var(
                "RECOMMENDER_MODEL_REGULARIZATION",
                fd.regularization,
            )?,
            init_std: fd.init_std,
            seed: parse_env_var("RECOMMENDER_MODEL_SEED", fd.seed)?,
            solver,
        };

        let scale = RatingScale::new(
            parse_env_var("RECOMMENDER_RATING_MIN", scale_defaults.lower)?,
            parse_env_var("RECOMMENDER_RATING_MAX", scale_defaults.upper)?,
        );

        let positive_kinds = std::env::var("RECOMMENDER_POSITIVE_KINDS")
            .map(|raw| parse_kinds(&raw))
            .unwrap_or(defaults.positive_kinds);

        let retrain_secs: u64 = parse_env_var("RECOMMENDER_RETRAIN_INTERVAL_SECS", 0)?;

        Ok(Self {
            model: ModelConfig {
                factorization,
                scale,
            },
            positive_kinds,
            default_top_n: parse_env_var("RECOMMENDER_DEFAULT_TOP_N", defaults.default_top_n)?,
            max_top_n: parse_env_var("RECOMMENDER_MAX_TOP_N", defaults.max_top_n)?,
            retrain_interval: (retrain_secs > 0).then(|| Duration::from_secs(retrain_secs)),
            train_on_startup: parse_env_var(
                "RECOMMENDER_TRAIN_ON_STARTUP",
                defaults.train_on_startup,
            )?,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        self.model
            .factorization
            .validate()
            .map_err(|e| CoreError::config(e, "RECOMMENDER_MODEL_FACTORS"))?;

        if self.model.factorization.epochs == 0 {
            return Err(CoreError::config(
                "epochs must be greater than 0",
                "RECOMMENDER_MODEL_EPOCHS",
            ));
        }

        if !self.model.scale.is_valid() {
            return Err(CoreError::config(
                format!(
                    "rating scale [{}, {}] must be finite with min < max",
                    self.model.scale.lower, self.model.scale.upper
                ),
                "RECOMMENDER_RATING_MIN",
            ));
        }

        if self.positive_kinds.is_empty() {
            return Err(CoreError::config(
                "at least one positive interaction kind is required",
                "RECOMMENDER_POSITIVE_KINDS",
            ));
        }

        if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
            return Err(CoreError::config(
                format!(
                    "default_top_n ({}) must be between 1 and max_top_n ({})",
                    self.default_top_n, self.max_top_n
                ),
                "RECOMMENDER_DEFAULT_TOP_N",
            ));
        }

        Ok(())
    }
}
