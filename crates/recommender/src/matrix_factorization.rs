//! Biased matrix factorization
//!
//! Decomposes the sparse user-item rating matrix into per-user and per-item
//! latent factors plus biases, so that
//!
//! ```text
//! r(u, i) ~ mean + b_u + b_i + p_u . q_i
//! ```
//!
//! Two solvers are provided:
//! - `Solver::Sgd`: stochastic gradient descent over the observed ratings,
//!   visiting them in a seed-determined shuffled order each epoch.
//! - `Solver::Als`: alternating least squares. Each half-step solves the
//!   regularized normal equations for one side with a Cholesky decomposition.
//!
//! Factor initialization and SGD ordering are drawn from a `StdRng` seeded
//! with `FactorizationConfig::seed`, so fitting the same matrix twice with the
//! same configuration produces identical factors.

use crate::error::{RecommenderError, Result};
use crate::rating::Rating;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// Optimization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    Sgd,
    Als,
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sgd" => Ok(Solver::Sgd),
            "als" => Ok(Solver::Als),
            other => Err(format!("unknown solver '{}', expected 'sgd' or 'als'", other)),
        }
    }
}

/// Solver hyperparameters
#[derive(Debug, Clone)]
pub struct FactorizationConfig {
    /// Number of latent factors (embedding dimension)
    pub latent_factors: usize,
    /// Passes over the data (SGD epochs or ALS sweeps)
    pub epochs: usize,
    /// SGD step size
    pub learning_rate: f32,
    /// L2 regularization (lambda)
    pub regularization: f32,
    /// Spread of the initial factor values
    pub init_std: f32,
    pub seed: u64,
    pub solver: Solver,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            latent_factors: 50,
            epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            init_std: 0.1,
            seed: 42,
            solver: Solver::Sgd,
        }
    }
}

impl FactorizationConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.latent_factors == 0 {
            return Err("latent_factors must be greater than 0".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("learning_rate must be a positive number".to_string());
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err("regularization must be a positive number".to_string());
        }
        if !(self.init_std.is_finite() && self.init_std >= 0.0) {
            return Err("init_std must be a non-negative number".to_string());
        }
        Ok(())
    }
}

/// Sparse user-item rating matrix
///
/// Entries keep insertion order so that solvers iterate deterministically.
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    /// (user_index, item_index, rating)
    pub entries: Vec<(usize, usize, f32)>,
    pub num_users: usize,
    pub num_items: usize,
}

impl SparseMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_idx: usize, item_idx: usize, value: f32) {
        self.entries.push((user_idx, item_idx, value));
        self.num_users = self.num_users.max(user_idx + 1);
        self.num_items = self.num_items.max(item_idx + 1);
    }

    pub fn get(&self, user_idx: usize, item_idx: usize) -> Option<f32> {
        self.entries
            .iter()
            .find(|(u, i, _)| *u == user_idx && *i == item_idx)
            .map(|(_, _, r)| *r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mean(&self) -> Option<f32> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|(_, _, r)| *r as f64).sum();
        Some((sum / self.entries.len() as f64) as f32)
    }

    fn by_user(&self) -> Vec<Vec<(usize, f32)>> {
        let mut rows = vec![Vec::new(); self.num_users];
        for &(u, i, r) in &self.entries {
            rows[u].push((i, r));
        }
        rows
    }

    fn by_item(&self) -> Vec<Vec<(usize, f32)>> {
        let mut cols = vec![Vec::new(); self.num_items];
        for &(u, i, r) in &self.entries {
            cols[i].push((u, r));
        }
        cols
    }
}

/// Bidirectional id <-> matrix index mapping
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    index_of: HashMap<String, usize>,
    ids: Vec<String>,
}

impl IdIndex {
    fn get_or_insert(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index_of.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.index_of.insert(id.to_string(), idx);
        self.ids.push(id.to_string());
        idx
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Learned parameters
#[derive(Debug, Clone)]
pub struct Factors {
    pub global_mean: f32,
    pub user_bias: Array1<f32>,
    pub item_bias: Array1<f32>,
    /// [num_users x latent_factors]
    pub user_factors: Array2<f32>,
    /// [num_items x latent_factors]
    pub item_factors: Array2<f32>,
}

impl Factors {
    fn estimate(&self, u: usize, i: usize) -> f32 {
        self.global_mean
            + self.user_bias[u]
            + self.item_bias[i]
            + self.user_factors.row(u).dot(&self.item_factors.row(i))
    }

    fn is_finite(&self) -> bool {
        self.global_mean.is_finite()
            && self.user_bias.iter().all(|v| v.is_finite())
            && self.item_bias.iter().all(|v| v.is_finite())
            && self.user_factors.iter().all(|v| v.is_finite())
            && self.item_factors.iter().all(|v| v.is_finite())
    }
}

/// Matrix factorization model
pub struct MatrixFactorization {
    config: FactorizationConfig,
    pub users: IdIndex,
    pub items: IdIndex,
    /// `None` until `fit` succeeds on a non-empty matrix
    pub factors: Option<Factors>,
}

impl MatrixFactorization {
    pub fn new(config: FactorizationConfig) -> Self {
        Self {
            config,
            users: IdIndex::default(),
            items: IdIndex::default(),
            factors: None,
        }
    }

    /// Build the sparse matrix, resetting the id mappings
    pub fn build_matrix(&mut self, ratings: &[Rating]) -> SparseMatrix {
        self.users = IdIndex::default();
        self.items = IdIndex::default();
        self.factors = None;

        let mut matrix = SparseMatrix::new();
        for rating in ratings {
            let u = self.users.get_or_insert(&rating.user_id);
            let i = self.items.get_or_insert(&rating.product_id);
            matrix.insert(u, i, rating.value);
        }
        matrix
    }

    /// Fit factors to `matrix`, returning the final training RMSE
    ///
    /// An empty matrix leaves the model without factors and reports `None`.
    pub fn fit(&mut self, matrix: &SparseMatrix) -> Result<Option<f32>> {
        self.config
            .validate()
            .map_err(RecommenderError::Training)?;

        let Some(global_mean) = matrix.mean() else {
            self.factors = None;
            return Ok(None);
        };

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut factors = self.init_factors(matrix, global_mean, &mut rng);

        match self.config.solver {
            Solver::Sgd => self.run_sgd(matrix, &mut factors, &mut rng),
            Solver::Als => self.run_als(matrix, &mut factors)?,
        }

        if !factors.is_finite() {
            return Err(RecommenderError::Training(
                "factorization diverged; lower the learning rate or raise regularization"
                    .to_string(),
            ));
        }

        let rmse = Self::compute_rmse(matrix, &factors);
        self.factors = Some(factors);
        Ok(Some(rmse))
    }

    fn init_factors(&self, matrix: &SparseMatrix, global_mean: f32, rng: &mut StdRng) -> Factors {
        let k = self.config.latent_factors;
        // Uniform on [-a, a] has standard deviation a / sqrt(3)
        let spread = self.config.init_std * 3f32.sqrt();
        let mut sample = || {
            if spread > 0.0 {
                rng.gen_range(-spread..=spread)
            } else {
                0.0
            }
        };

        let user_factors = Array2::from_shape_fn((matrix.num_users, k), |_| sample());
        let item_factors = Array2::from_shape_fn((matrix.num_items, k), |_| sample());

        Factors {
            global_mean,
            user_bias: Array1::zeros(matrix.num_users),
            item_bias: Array1::zeros(matrix.num_items),
            user_factors,
            item_factors,
        }
    }

    fn run_sgd(&self, matrix: &SparseMatrix, factors: &mut Factors, rng: &mut StdRng) {
        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let k = self.config.latent_factors;
        let mut order: Vec<usize> = (0..matrix.len()).collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(rng);

            for &idx in &order {
                let (u, i, rating) = matrix.entries[idx];
                let err = rating - factors.estimate(u, i);

                let bu = factors.user_bias[u];
                let bi = factors.item_bias[i];
                factors.user_bias[u] = bu + lr * (err - reg * bu);
                factors.item_bias[i] = bi + lr * (err - reg * bi);

                for f in 0..k {
                    let puf = factors.user_factors[[u, f]];
                    let qif = factors.item_factors[[i, f]];
                    factors.user_factors[[u, f]] = puf + lr * (err * qif - reg * puf);
                    factors.item_factors[[i, f]] = qif + lr * (err * puf - reg * qif);
                }
            }

            if epoch % 5 == 0 {
                let rmse = Self::compute_rmse(matrix, factors);
                debug!(epoch, rmse, "SGD epoch");
            }
        }
    }

    fn run_als(&self, matrix: &SparseMatrix, factors: &mut Factors) -> Result<()> {
        let by_user = matrix.by_user();
        let by_item = matrix.by_item();
        let lambda = self.config.regularization as f64;

        for sweep in 0..self.config.epochs {
            for (u, items) in by_user.iter().enumerate() {
                if items.is_empty() {
                    continue;
                }
                let (bias, vector) = Self::solve_side(
                    items,
                    factors.global_mean,
                    &factors.item_bias,
                    &factors.item_factors,
                    factors.user_factors.row(u).to_owned(),
                    lambda,
                )
                .map_err(|e| {
                    RecommenderError::Training(format!("user factors: {}", e))
                })?;
                factors.user_bias[u] = bias;
                factors.user_factors.row_mut(u).assign(&vector);
            }

            for (i, users) in by_item.iter().enumerate() {
                if users.is_empty() {
                    continue;
                }
                let (bias, vector) = Self::solve_side(
                    users,
                    factors.global_mean,
                    &factors.user_bias,
                    &factors.user_factors,
                    factors.item_factors.row(i).to_owned(),
                    lambda,
                )
                .map_err(|e| {
                    RecommenderError::Training(format!("item factors: {}", e))
                })?;
                factors.item_bias[i] = bias;
                factors.item_factors.row_mut(i).assign(&vector);
            }

            if sweep % 2 == 0 {
                let rmse = Self::compute_rmse(matrix, factors);
                debug!(sweep, rmse, "ALS sweep");
            }
        }

        Ok(())
    }

    /// One ALS half-step for a single row
    ///
    /// With the opposite side fixed, first re-estimates this row's bias from
    /// the residuals of its current vector, then solves
    /// `(Y^T Y + lambda * n * I) x = Y^T (r - mean - b_row - b_other)`.
    fn solve_side(
        observed: &[(usize, f32)],
        global_mean: f32,
        other_bias: &Array1<f32>,
        other_factors: &Array2<f32>,
        current: Array1<f32>,
        lambda: f64,
    ) -> std::result::Result<(f32, Array1<f32>), String> {
        let k = other_factors.ncols();
        let n = observed.len() as f64;

        let residual_sum: f64 = observed
            .iter()
            .map(|&(j, r)| {
                (r - global_mean - other_bias[j] - current.dot(&other_factors.row(j))) as f64
            })
            .sum();
        let bias = (residual_sum / (lambda + n)) as f32;

        let mut a = Array2::<f64>::zeros((k, k));
        let mut b = Array1::<f64>::zeros(k);

        for &(j, r) in observed {
            let y = other_factors.row(j);
            let target = (r - global_mean - bias - other_bias[j]) as f64;

            for p in 0..k {
                let yp = y[p] as f64;
                b[p] += target * yp;
                for q in 0..k {
                    a[[p, q]] += yp * y[q] as f64;
                }
            }
        }

        for p in 0..k {
            a[[p, p]] += lambda * n;
        }

        let x = Self::solve_least_squares(&a, &b)?;
        Ok((bias, x.mapv(|v| v as f32)))
    }

    /// Solve `A x = b` for symmetric positive definite `A` via Cholesky
    fn solve_least_squares(
        a: &Array2<f64>,
        b: &Array1<f64>,
    ) -> std::result::Result<Array1<f64>, String> {
        let n = a.nrows();

        // A = L * L^T
        let mut l = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l[[i, k]] * l[[j, k]];
                }

                if i == j {
                    let diag = a[[i, i]] - sum;
                    if diag <= 0.0 {
                        return Err("matrix is not positive definite".to_string());
                    }
                    l[[i, j]] = diag.sqrt();
                } else {
                    l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
                }
            }
        }

        // L * y = b
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * y[j];
            }
            y[i] = (b[i] - sum) / l[[i, i]];
        }

        // L^T * x = y
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += l[[j, i]] * x[j];
            }
            x[i] = (y[i] - sum) / l[[i, i]];
        }

        Ok(x)
    }

    fn compute_rmse(matrix: &SparseMatrix, factors: &Factors) -> f32 {
        if matrix.is_empty() {
            return 0.0;
        }

        let squared: f64 = matrix
            .entries
            .iter()
            .map(|&(u, i, r)| ((r - factors.estimate(u, i)) as f64).powi(2))
            .sum();

        (squared / matrix.len() as f64).sqrt() as f32
    }

    /// Raw (unclipped) estimate; `None` if either id was not in the training data
    pub fn predict(&self, user_id: &str, item_id: &str) -> Option<f32> {
        let factors = self.factors.as_ref()?;
        let u = self.users.get(user_id)?;
        let i = self.items.get(item_id)?;
        Some(factors.estimate(u, i))
    }

    pub fn get_item_embedding(&self, item_id: &str) -> Option<Vec<f32>> {
        let factors = self.factors.as_ref()?;
        let i = self.items.get(item_id)?;
        Some(factors.item_factors.row(i).to_vec())
    }

    pub fn global_mean(&self) -> Option<f32> {
        self.factors.as_ref().map(|f| f.global_mean)
    }

    /// Cosine similarity between two embeddings; 0.0 for mismatched or zero vectors
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}
