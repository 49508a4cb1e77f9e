//! Linear soft-margin SVM trained by per-sample hinge-loss sub-gradient steps.

use tracing::{debug, instrument};

use crate::error::MlError;
use crate::model::{Classifier, Estimator, POSITIVE};
use crate::validate::{check_prediction_input, check_training_data};

/// Configuration for the linear SVM.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `learning_rate` | 0.0001  |
/// | `max_iter`      | 3000    |
/// | `c`             | 10.0    |
#[derive(Debug, Clone)]
pub struct SvmConfig {
    learning_rate: f64,
    max_iter: usize,
    c: f64,
}

impl SvmConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            learning_rate: 0.0001,
            max_iter: 3000,
            c: 10.0,
        }
    }

    /// Set the step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the number of passes over the training set.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the misclassification penalty.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Return the step size.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the number of passes.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the misclassification penalty.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
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
        if !(self.c.is_finite() && self.c >= 0.0) {
            return Err(MlError::InvalidRegularization {
                name: "c",
                value: self.c,
            });
        }
        Ok(())
    }
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for SvmConfig {
    type Model = SupportVectorMachine;

    fn name(&self) -> &'static str {
        "Support Vector Machine"
    }

    /// Fit from zero weights with labels mapped to {-1, +1}.
    ///
    /// Each pass visits rows in order. A row inside the margin
    /// (`y * (w·x + b) < 1`) moves `w ← w - lr * (w - C*y*x)` and
    /// `b ← b + lr*C*y`; any other row only shrinks `w ← w - lr*w`.
    ///
    /// # Errors
    ///
    /// Input validation errors, [`MlError::InvalidLearningRate`],
    /// [`MlError::InvalidIterationCount`] and [`MlError::InvalidRegularization`].
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<SupportVectorMachine, MlError> {
        let n_features = check_training_data(features, labels)?;
        self.validate()?;

        let signs: Vec<f64> = labels
            .iter()
            .map(|&l| if l == POSITIVE { 1.0 } else { -1.0 })
            .collect();
        let lr = self.learning_rate;
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            for (row, &y) in features.iter().zip(&signs) {
                if y * decision(&weights, bias, row) < 1.0 {
                    for (w, &x) in weights.iter_mut().zip(row) {
                        *w -= lr * (*w - self.c * y * x);
                    }
                    bias += lr * self.c * y;
                } else {
                    for w in &mut weights {
                        *w -= lr * *w;
                    }
                }
            }
        }

        debug!(bias, "svm trained");
        Ok(SupportVectorMachine { weights, bias })
    }
}

fn decision(weights: &[f64], bias: f64, row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + bias
}

/// A fitted linear SVM.
#[derive(Debug, Clone)]
pub struct SupportVectorMachine {
    weights: Vec<f64>,
    bias: f64,
}

impl SupportVectorMachine {
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

    /// Signed decision value `w·x + b` per row.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn decision_function(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, MlError> {
        check_prediction_input(features, self.weights.len())?;
        Ok(features
            .iter()
            .map(|row| decision(&self.weights, self.bias, row))
            .collect())
    }
}

impl Classifier for SupportVectorMachine {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Label 1 when the decision value is non-negative.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        Ok(self
            .decision_function(features)?
            .into_iter()
            .map(|d| usize::from(d >= 0.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_separable_data() {
        let features = vec![
            vec![-2.0, -1.0],
            vec![-1.5, -0.5],
            vec![-1.0, -1.5],
            vec![1.0, 1.5],
            vec![1.5, 0.5],
            vec![2.0, 1.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let model = SvmConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(model.predict(&features).unwrap(), labels);
    }

    #[test]
    fn single_update_matches_rule() {
        // One pass, one positive row: starts inside the margin.
        let model = SvmConfig::new()
            .with_learning_rate(0.1)
            .with_max_iter(1)
            .with_c(1.0)
            .fit(&[vec![2.0]], &[1])
            .unwrap();
        // w = 0 - 0.1 * (0 - 1*1*2) = 0.2, b = 0.1
        assert!((model.weights()[0] - 0.2).abs() < 1e-12);
        assert!((model.bias() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_decision_predicts_positive() {
        let model = SupportVectorMachine {
            weights: vec![0.0],
            bias: 0.0,
        };
        assert_eq!(model.predict(&[vec![5.0]]).unwrap(), vec![1]);
    }

    #[test]
    fn invalid_hyperparameters_rejected() {
        let err = SvmConfig::new()
            .with_max_iter(0)
            .fit(&[vec![1.0]], &[0])
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidIterationCount { max_iter: 0 }));
        let err = SvmConfig::new()
            .with_c(f64::NAN)
            .fit(&[vec![1.0]], &[0])
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidRegularization { name: "c", .. }));
    }

    #[test]
    fn wrong_width_rejected() {
        let model = SvmConfig::new().with_max_iter(1).fit(&[vec![1.0, 2.0]], &[1]).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(MlError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }
}
