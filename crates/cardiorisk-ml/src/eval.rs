//! Contiguous k-fold cross-validation for any [`Estimator`].

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::MlError;
use crate::metrics::accuracy;
use crate::model::{Classifier, Estimator};
use crate::validate::check_training_data;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`].
#[derive(Debug, Clone, Copy)]
pub struct CrossValidation {
    n_folds: usize,
}

/// Results of k-fold cross-validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrossValidationResult {
    /// Accuracy for each fold, in fold order.
    pub fold_accuracies: Vec<f64>,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Population standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of samples.
    pub n_samples: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, MlError> {
        if n_folds < 2 {
            return Err(MlError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds })
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Half-open `[start, end)` row range held out in `fold`.
    ///
    /// Blocks have `⌊n / n_folds⌋` rows; the last block also takes the remainder.
    fn fold_range(&self, fold: usize, n_samples: usize) -> (usize, usize) {
        let fold_size = n_samples / self.n_folds;
        let start = fold * fold_size;
        let end = if fold + 1 == self.n_folds {
            n_samples
        } else {
            start + fold_size
        };
        (start, end)
    }

    /// Run k-fold cross-validation.
    ///
    /// Rows are not shuffled. For each fold a fresh model is fitted from
    /// `estimator` on the remaining rows and scored on the held-out block.
    /// Folds run in parallel; results are reported in fold order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | Validation errors | Empty, ragged or non-finite features; bad labels |
    /// | [`MlError::TooFewSamplesForFolds`] | Fewer samples than folds |
    /// | Other errors | From fitting or predicting in any fold |
    #[instrument(skip_all, fields(model = estimator.name(), n_folds = self.n_folds, n_samples = features.len()))]
    pub fn evaluate<E: Estimator>(
        &self,
        estimator: &E,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<CrossValidationResult, MlError> {
        check_training_data(features, labels)?;
        let n_samples = features.len();
        if n_samples < self.n_folds {
            return Err(MlError::TooFewSamplesForFolds {
                n_samples,
                n_folds: self.n_folds,
            });
        }

        let fold_accuracies: Vec<f64> = (0..self.n_folds)
            .into_par_iter()
            .map(|fold| -> Result<f64, MlError> {
                let (start, end) = self.fold_range(fold, n_samples);

                let train_features: Vec<Vec<f64>> = features[..start]
                    .iter()
                    .chain(&features[end..])
                    .cloned()
                    .collect();
                let train_labels: Vec<usize> = labels[..start]
                    .iter()
                    .chain(&labels[end..])
                    .copied()
                    .collect();

                let model = estimator.fit(&train_features, &train_labels)?;
                let predictions = model.predict(&features[start..end])?;
                let fold_accuracy = accuracy(&labels[start..end], &predictions)?;

                debug!(fold, accuracy = fold_accuracy, "fold completed");
                Ok(fold_accuracy)
            })
            .collect::<Result<_, _>>()?;

        let n = self.n_folds as f64;
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n;
        let std_accuracy = (fold_accuracies
            .iter()
            .map(|&a| (a - mean_accuracy).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        info!(mean_accuracy, std_accuracy, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_accuracies,
            mean_accuracy,
            std_accuracy,
            n_folds: self.n_folds,
            n_samples,
        })
    }
}
