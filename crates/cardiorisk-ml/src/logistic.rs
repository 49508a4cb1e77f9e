//! L2-regularized logistic regression trained by batch gradient descent.

use tracing::{debug, instrument, warn};

use crate::error::MlError;
use crate::model::{ClassProbabilities, Classifier, Estimator, ProbabilisticClassifier};
use crate::validate::{check_prediction_input, check_training_data};

const SIGMOID_CLAMP: f64 = 500.0;
const PROBABILITY_EPSILON: f64 = 1e-15;
const LEARNING_RATE_DECAY: f64 = 0.0001;

/// Configuration for logistic regression.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `learning_rate` | 0.01    |
/// | `max_iter`      | 5000    |
/// | `l2`            | 0.1     |
/// | `tolerance`     | 1e-6    |
#[derive(Debug, Clone)]
pub struct LogisticRegressionConfig {
    learning_rate: f64,
    max_iter: usize,
    l2: f64,
    tolerance: f64,
}

impl LogisticRegressionConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            learning_rate: 0.01,
            max_iter: 5000,
            l2: 0.1,
            tolerance: 1e-6,
        }
    }

    /// Set the base learning rate. The effective step at iteration `t` is
    /// `learning_rate / (1 + t * 0.0001)`.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the L2 penalty coefficient.
    #[must_use]
    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    /// Set the early-stopping tolerance on the change in cost.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Return the base learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the iteration cap.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the L2 penalty coefficient.
    #[must_use]
    pub fn l2(&self) -> f64 {
        self.l2
    }

    /// Return the early-stopping tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn validate(&self) -> Result<(), MlError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(MlError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.max_iter == 0 {
            return Err(MlError::InvalidIterationCount { max_iter: 0 });
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(MlError::InvalidRegularization {
                name: "l2",
                value: self.l2,
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(MlError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP)).exp())
}

fn linear(weights: &[f64], bias: f64, row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + bias
}

impl Estimator for LogisticRegressionConfig {
    type Model = LogisticRegression;

    fn name(&self) -> &'static str {
        "Logistic Regression"
    }

    /// Fit by gradient descent from zero weights.
    ///
    /// Stops when the cost changes by less than `tolerance` between
    /// iterations. Reaching `max_iter` first is not an error; the model
    /// records `converged = false`.
    ///
    /// # Errors
    ///
    /// Input validation errors, [`MlError::InvalidLearningRate`],
    /// [`MlError::InvalidIterationCount`], [`MlError::InvalidRegularization`]
    /// and [`MlError::InvalidTolerance`].
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<LogisticRegression, MlError> {
        let n_features = check_training_data(features, labels)?;
        self.validate()?;

        let m = features.len() as f64;
        let targets: Vec<f64> = labels.iter().map(|&l| l as f64).collect();
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        let mut prev_cost = f64::INFINITY;
        let mut n_iter = self.max_iter;
        let mut converged = false;
        let mut cost = f64::NAN;

        for iter in 0..self.max_iter {
            let probs: Vec<f64> = features
                .iter()
                .map(|row| sigmoid(linear(&weights, bias, row)))
                .collect();

            let cross_entropy: f64 = probs
                .iter()
                .zip(&targets)
                .map(|(&p, &y)| {
                    let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
                    -y * p.ln() - (1.0 - y) * (1.0 - p).ln()
                })
                .sum();
            let penalty: f64 = weights.iter().map(|w| w * w).sum();
            cost = cross_entropy / m + self.l2 * penalty / (2.0 * m);

            let mut dw = vec![0.0; n_features];
            let mut db = 0.0;
            for ((row, &p), &y) in features.iter().zip(&probs).zip(&targets) {
                let err = p - y;
                for (g, &x) in dw.iter_mut().zip(row) {
                    *g += err * x;
                }
                db += err;
            }

            let step = self.learning_rate / (1.0 + iter as f64 * LEARNING_RATE_DECAY);
            for (w, g) in weights.iter_mut().zip(&dw) {
                *w -= step * (g / m + self.l2 * *w);
            }
            bias -= step * db / m;

            if (prev_cost - cost).abs() < self.tolerance {
                n_iter = iter + 1;
                converged = true;
                break;
            }
            prev_cost = cost;
        }

        if converged {
            debug!(n_iter, cost, "logistic regression converged");
        } else {
            warn!(
                max_iter = self.max_iter,
                cost, "logistic regression reached the iteration cap without converging"
            );
        }

        Ok(LogisticRegression {
            weights,
            bias,
            n_iter,
            converged,
        })
    }
}

/// A fitted logistic regression model.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
    n_iter: usize,
    converged: bool,
}

impl LogisticRegression {
    /// Learned feature weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Learned intercept.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Iterations actually run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Whether the cost change fell below the tolerance before the cap.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Positive-class probability per row.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn positive_probability(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, MlError> {
        check_prediction_input(features, self.weights.len())?;
        Ok(features
            .iter()
            .map(|row| sigmoid(linear(&self.weights, self.bias, row)))
            .collect())
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Label 1 when the probability is at least 0.5.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        Ok(self
            .positive_probability(features)?
            .into_iter()
            .map(|p| usize::from(p >= 0.5))
            .collect())
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<ClassProbabilities>, MlError> {
        Ok(self
            .positive_probability(features)?
            .into_iter()
            .map(ClassProbabilities::from_positive)
            .collect())
    }
}
