//! Product Recommendation Engine
//!
//! Learns user and product latent factors from implicit interaction history
//! (views and purchases) and serves top-N product recommendations.
//!
//! Data flows from the [`store`] through the [`rating`] transform into the
//! [`model`], which publishes immutable snapshots that the [`ranker`] scores
//! candidates against. [`service::RecommendationService`] ties these together
//! for the HTTP layer in [`server`].

pub mod config;
pub mod error;
pub mod interaction;
pub mod matrix_factorization;
pub mod model;
pub mod ranker;
pub mod rating;
pub mod retrain;
pub mod server;
pub mod service;
pub mod store;


pub use config::RecommenderConfig;
pub use error::{RecommenderError, Result};
pub use interaction::{Interaction, InteractionKind, Product};
pub use matrix_factorization::{FactorizationConfig, MatrixFactorization, Solver};
pub use model::{FactorizationModel, ModelConfig, ModelStatus, TrainedModel, TrainingReport};
pub use ranker::{CandidateRanker, ScoredProduct};
pub use rating::{Rating, RatingScale, RatingTransform, TrainingSet};
pub use retrain::spawn_retrain_task;
pub use service::RecommendationService;
pub use store::{InMemoryInteractionStore, InteractionStore, PostgresInteractionStore};
