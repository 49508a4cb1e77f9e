//! k-nearest-neighbour classification by Euclidean distance.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::error::MlError;
use crate::model::{Classifier, Estimator};
use crate::validate::{check_prediction_input, check_training_data};
use crate::vote;

/// Configuration for k-NN.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `k`       | 7       |
#[derive(Debug, Clone)]
pub struct KnnConfig {
    k: usize,
}

impl KnnConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self { k: 7 }
    }

    /// Set the number of neighbours that vote.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Return the number of neighbours that vote.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for KnnConfig {
    type Model = KNearestNeighbors;

    fn name(&self) -> &'static str {
        "K-Nearest Neighbors"
    }

    /// Retain a copy of the training set.
    ///
    /// # Errors
    ///
    /// Input validation errors and [`MlError::InvalidNeighborCount`] when `k` is 0.
    #[instrument(skip_all, fields(n_samples = features.len(), k = self.k))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<KNearestNeighbors, MlError> {
        let n_features = check_training_data(features, labels)?;
        if self.k == 0 {
            return Err(MlError::InvalidNeighborCount { k: 0 });
        }
        if self.k > features.len() {
            debug!(n_samples = features.len(), "k exceeds training size, all rows vote");
        }
        Ok(KNearestNeighbors {
            features: features.to_vec(),
            labels: labels.to_vec(),
            n_features,
            k: self.k,
        })
    }
}

/// A fitted k-NN model: the retained training rows.
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
    n_features: usize,
    k: usize,
}

impl KNearestNeighbors {
    /// Number of neighbours that vote.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    fn classify(&self, query: &[f64]) -> usize {
        let mut distances: Vec<(f64, usize)> = self
            .features
            .iter()
            .zip(&self.labels)
            .map(|(row, &label)| (euclidean(row, query), label))
            .collect();
        // Stable: equal distances keep training order.
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (neg, pos) = vote::tally(distances.iter().take(self.k).map(|&(_, l)| l));
        vote::majority(neg, pos)
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

impl Classifier for KNearestNeighbors {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        check_prediction_input(features, self.n_features)?;
        Ok(features.par_iter().map(|q| self.classify(q)).collect())
    }
}
