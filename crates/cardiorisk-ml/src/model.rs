//! The model contract shared by every learner.
//!
//! Configurations implement [`Estimator`]: `fit` borrows the configuration and
//! returns a brand-new fitted model, so the same configuration can be fitted
//! any number of times (one fresh model per cross-validation fold). Fitted
//! models implement [`Classifier`] and, when they can estimate probabilities,
//! [`ProbabilisticClassifier`].

use crate::error::MlError;

/// Class label for a patient without disease.
pub const NEGATIVE: usize = 0;

/// Class label for a patient with disease.
pub const POSITIVE: usize = 1;

/// Probability pair `[P(label = 0), P(label = 1)]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ClassProbabilities {
    negative: f64,
    positive: f64,
}

impl ClassProbabilities {
    /// Build the pair from the positive-class probability.
    #[must_use]
    pub fn from_positive(positive: f64) -> Self {
        Self {
            negative: 1.0 - positive,
            positive,
        }
    }

    /// Probability of the negative class.
    #[must_use]
    pub fn negative(&self) -> f64 {
        self.negative
    }

    /// Probability of the positive class.
    #[must_use]
    pub fn positive(&self) -> f64 {
        self.positive
    }

    /// Return the pair as `[p0, p1]`.
    #[must_use]
    pub fn as_pair(&self) -> [f64; 2] {
        [self.negative, self.positive]
    }
}

/// An unfitted model configuration.
pub trait Estimator: Send + Sync {
    /// The fitted model type produced by [`Estimator::fit`].
    type Model: Classifier;

    /// Human-readable model name.
    fn name(&self) -> &'static str;

    /// Train a new model on `features` (row-major) and binary `labels`.
    ///
    /// # Errors
    ///
    /// Fails on an empty or ragged matrix, non-finite values, a label count
    /// that differs from the row count, labels outside {0, 1}, or invalid
    /// hyperparameters.
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<Self::Model, MlError>;
}

/// A fitted binary classifier.
pub trait Classifier: Send + Sync {
    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict a label in {0, 1} for every row.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] when a row's width
    /// differs from [`Classifier::n_features`].
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError>;
}

/// A fitted classifier that can also estimate class probabilities.
pub trait ProbabilisticClassifier: Classifier {
    /// Return `[p0, p1]` for every row.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] when a row's width
    /// differs from [`Classifier::n_features`].
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<ClassProbabilities>, MlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_sum_to_one() {
        let p = ClassProbabilities::from_positive(0.3);
        assert!((p.negative() + p.positive() - 1.0).abs() < 1e-12);
        assert_eq!(p.as_pair(), [0.7, 0.3]);
    }
}
