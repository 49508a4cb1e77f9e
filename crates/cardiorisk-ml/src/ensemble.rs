//! Accuracy-weighted blend of logistic regression, random forest and SVM.
//!
//! Logistic regression and the SVM see standardized features; the forest sees
//! raw features. Member weights are the members' k-fold cross-validation
//! accuracies on the training set, normalized to sum to 1.

use tracing::{info, instrument};

use crate::error::MlError;
use crate::eval::CrossValidation;
use crate::forest::{RandomForest, RandomForestConfig};
use crate::logistic::{LogisticRegression, LogisticRegressionConfig};
use crate::model::{ClassProbabilities, Classifier, Estimator, ProbabilisticClassifier};
use crate::preprocess::{Standardizer, standardize_features};
use crate::svm::{SupportVectorMachine, SvmConfig};
use crate::validate::{check_prediction_input, check_training_data};

/// How query rows are standardized before reaching the LR and SVM members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScaling {
    /// Recompute mean and std over each prediction batch.
    ///
    /// A single-row batch standardizes to all zeros.
    #[default]
    BatchStatistics,
    /// Reuse the statistics computed on the training set.
    TrainingStatistics,
}

/// Normalized member weights, summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BlendWeights {
    /// Weight of the logistic regression member.
    pub logistic_regression: f64,
    /// Weight of the random forest member.
    pub random_forest: f64,
    /// Weight of the SVM member.
    pub svm: f64,
}

impl BlendWeights {
    /// Normalize raw member scores. All-zero scores give uniform weights.
    #[must_use]
    pub fn from_scores(logistic_regression: f64, random_forest: f64, svm: f64) -> Self {
        let total = logistic_regression + random_forest + svm;
        if total <= 0.0 {
            let third = 1.0 / 3.0;
            return Self {
                logistic_regression: third,
                random_forest: third,
                svm: third,
            };
        }
        Self {
            logistic_regression: logistic_regression / total,
            random_forest: random_forest / total,
            svm: svm / total,
        }
    }

    /// Sum of the three weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.logistic_regression + self.random_forest + self.svm
    }
}

/// Configuration for the ensemble.
///
/// # Defaults
///
/// | Parameter       | Default                              |
/// |-----------------|--------------------------------------|
/// | `logistic`      | [`LogisticRegressionConfig::new`]    |
/// | `forest`        | [`RandomForestConfig::new`]          |
/// | `svm`           | [`SvmConfig::new`]                   |
/// | `cv_folds`      | 3                                    |
/// | `query_scaling` | [`QueryScaling::BatchStatistics`]    |
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    logistic: LogisticRegressionConfig,
    forest: RandomForestConfig,
    svm: SvmConfig,
    cv_folds: usize,
    query_scaling: QueryScaling,
}

impl EnsembleConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            logistic: LogisticRegressionConfig::new(),
            forest: RandomForestConfig::new(),
            svm: SvmConfig::new(),
            cv_folds: 3,
            query_scaling: QueryScaling::default(),
        }
    }

    /// Set the logistic regression member's configuration.
    #[must_use]
    pub fn with_logistic(mut self, logistic: LogisticRegressionConfig) -> Self {
        self.logistic = logistic;
        self
    }

    /// Set the random forest member's configuration.
    #[must_use]
    pub fn with_forest(mut self, forest: RandomForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Set the SVM member's configuration.
    #[must_use]
    pub fn with_svm(mut self, svm: SvmConfig) -> Self {
        self.svm = svm;
        self
    }

    /// Set the number of folds used to score members.
    #[must_use]
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Set how query batches are standardized.
    #[must_use]
    pub fn with_query_scaling(mut self, query_scaling: QueryScaling) -> Self {
        self.query_scaling = query_scaling;
        self
    }

    /// Return the number of folds used to score members.
    #[must_use]
    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    /// Return the query scaling mode.
    #[must_use]
    pub fn query_scaling(&self) -> QueryScaling {
        self.query_scaling
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn member<T>(model: &'static str, result: Result<T, MlError>) -> Result<T, MlError> {
    result.map_err(|source| MlError::EnsembleMember {
        model,
        source: Box::new(source),
    })
}

fn cv_score<E: Estimator>(
    cv: &CrossValidation,
    estimator: &E,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<f64, MlError> {
    member(
        estimator.name(),
        cv.evaluate(estimator, features, labels)
            .map(|r| r.mean_accuracy),
    )
}

impl Estimator for EnsembleConfig {
    type Model = EnsembleModel;

    fn name(&self) -> &'static str {
        "Ensemble Model"
    }

    /// Fit all three members concurrently, then weight them by CV accuracy.
    ///
    /// # Errors
    ///
    /// Input validation errors, [`MlError::InvalidFoldCount`], and
    /// [`MlError::EnsembleMember`] naming the first member that failed to
    /// train or score.
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<EnsembleModel, MlError> {
        let n_features = check_training_data(features, labels)?;
        let cv = CrossValidation::new(self.cv_folds)?;
        let (standardized, standardizer) = standardize_features(features)?;

        let ((logistic, forest), svm) = rayon::join(
            || {
                rayon::join(
                    || self.logistic.fit(&standardized, labels),
                    || self.forest.fit(features, labels),
                )
            },
            || self.svm.fit(&standardized, labels),
        );
        let logistic = member(self.logistic.name(), logistic)?;
        let forest = member(self.forest.name(), forest)?;
        let svm = member(self.svm.name(), svm)?;

        let accuracies = [
            cv_score(&cv, &self.logistic, &standardized, labels)?,
            cv_score(&cv, &self.forest, features, labels)?,
            cv_score(&cv, &self.svm, &standardized, labels)?,
        ];
        let weights = BlendWeights::from_scores(accuracies[0], accuracies[1], accuracies[2]);

        info!(
            lr_weight = weights.logistic_regression,
            rf_weight = weights.random_forest,
            svm_weight = weights.svm,
            "ensemble trained"
        );

        Ok(EnsembleModel {
            logistic,
            forest,
            svm,
            weights,
            member_accuracies: accuracies,
            standardizer,
            query_scaling: self.query_scaling,
            n_features,
        })
    }
}

/// A fitted ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    logistic: LogisticRegression,
    forest: RandomForest,
    svm: SupportVectorMachine,
    weights: BlendWeights,
    member_accuracies: [f64; 3],
    standardizer: Standardizer,
    query_scaling: QueryScaling,
    n_features: usize,
}

impl EnsembleModel {
    /// Normalized member weights.
    #[must_use]
    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    /// Mean CV accuracies of the members, in the order LR, RF, SVM.
    #[must_use]
    pub fn member_accuracies(&self) -> [f64; 3] {
        self.member_accuracies
    }

    /// Statistics computed on the training set.
    #[must_use]
    pub fn training_standardizer(&self) -> &Standardizer {
        &self.standardizer
    }

    /// Return the query scaling mode.
    #[must_use]
    pub fn query_scaling(&self) -> QueryScaling {
        self.query_scaling
    }

    /// Switch the query scaling mode of a fitted model.
    #[must_use]
    pub fn with_query_scaling(mut self, query_scaling: QueryScaling) -> Self {
        self.query_scaling = query_scaling;
        self
    }

    fn scale(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, MlError> {
        match self.query_scaling {
            QueryScaling::BatchStatistics => Ok(standardize_features(features)?.0),
            QueryScaling::TrainingStatistics => self.standardizer.apply(features),
        }
    }

    /// Weighted positive score per row; `forest_score` supplies the forest's term.
    fn blend(
        &self,
        features: &[Vec<f64>],
        lr_score: impl Fn(&LogisticRegression, &[Vec<f64>]) -> Result<Vec<f64>, MlError>,
        forest_score: impl Fn(&RandomForest, &[Vec<f64>]) -> Result<Vec<f64>, MlError>,
    ) -> Result<Vec<f64>, MlError> {
        check_prediction_input(features, self.n_features)?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let scaled = self.scale(features)?;
        let lr = lr_score(&self.logistic, &scaled)?;
        let rf = forest_score(&self.forest, features)?;
        let svm = self.svm.predict(&scaled)?;
        let w = self.weights;
        Ok(lr
            .iter()
            .zip(&rf)
            .zip(&svm)
            .map(|((&l, &r), &s)| {
                w.logistic_regression * l + w.random_forest * r + w.svm * s as f64
            })
            .collect())
    }
}

fn as_scores(labels: Vec<usize>) -> Vec<f64> {
    labels.into_iter().map(|l| l as f64).collect()
}

impl Classifier for EnsembleModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Weighted vote of the members' hard labels; 1 when the sum is at least 0.5.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        let scores = self.blend(
            features,
            |m, x| m.predict(x).map(as_scores),
            |m, x| m.predict(x).map(as_scores),
        )?;
        Ok(scores.into_iter().map(|s| usize::from(s >= 0.5)).collect())
    }
}

impl ProbabilisticClassifier for EnsembleModel {
    /// Blend of the LR probability, the forest's positive vote fraction and
    /// the SVM's hard label.
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<ClassProbabilities>, MlError> {
        let scores = self.blend(
            features,
            LogisticRegression::positive_probability,
            RandomForest::positive_vote_fraction,
        )?;
        // Rounding in the weighted sum can step just past 1.
        Ok(scores
            .into_iter()
            .map(|s| ClassProbabilities::from_positive(s.clamp(0.0, 1.0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..15 {
            let t = i as f64;
            features.push(vec![t * 0.2, 50.0 - t, 1.0]);
            labels.push(0);
            features.push(vec![10.0 + t * 0.2, 80.0 + t, 1.0]);
            labels.push(1);
        }
        (features, labels)
    }

    fn config() -> EnsembleConfig {
        EnsembleConfig::new().with_forest(RandomForestConfig::new().with_n_trees(15))
    }

    #[test]
    fn weights_sum_to_one() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        assert!((model.weights().sum() - 1.0).abs() < 1e-12);
        for acc in model.member_accuracies() {
            assert!((0.0..=1.0).contains(&acc));
        }
    }

    #[test]
    fn uniform_weights_when_scores_are_zero() {
        let w = BlendWeights::from_scores(0.0, 0.0, 0.0);
        assert!((w.logistic_regression - 1.0 / 3.0).abs() < 1e-12);
        assert!((w.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn learns_separable_data() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        assert_eq!(model.predict(&features).unwrap(), labels);
        for p in model.predict_proba(&features).unwrap() {
            assert!((p.negative() + p.positive() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn scaling_modes_agree_on_training_batch() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        let batch = model.predict(&features).unwrap();
        let reuse = model
            .with_query_scaling(QueryScaling::TrainingStatistics)
            .predict(&features)
            .unwrap();
        assert_eq!(batch, reuse);
    }

    #[test]
    fn training_statistics_handle_single_row() {
        let (features, labels) = separable();
        let model = config()
            .with_query_scaling(QueryScaling::TrainingStatistics)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(model.predict(&[vec![12.0, 90.0, 1.0]]).unwrap(), vec![1]);
        assert_eq!(model.predict(&[vec![0.5, 45.0, 1.0]]).unwrap(), vec![0]);
    }

    #[test]
    fn batch_statistics_zero_a_single_row() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        assert_eq!(model.query_scaling(), QueryScaling::BatchStatistics);
        let row = vec![vec![12.0, 90.0, 1.0]];
        assert_eq!(model.scale(&row).unwrap(), vec![vec![0.0; 3]]);

        // LR and SVM see the zero vector; the forest still sees the raw row.
        let zero = vec![vec![0.0; 3]];
        let w = model.weights();
        let lr = model.logistic.positive_probability(&zero).unwrap()[0];
        let rf = model.forest.positive_vote_fraction(&row).unwrap()[0];
        let svm = model.svm.predict(&zero).unwrap()[0] as f64;
        let expected = w.logistic_regression * lr + w.random_forest * rf + w.svm * svm;
        let batch = model.predict_proba(&row).unwrap()[0].positive();
        assert!((batch - expected).abs() < 1e-12);

        let reuse = model
            .with_query_scaling(QueryScaling::TrainingStatistics)
            .predict_proba(&row)
            .unwrap()[0]
            .positive();
        assert!((batch - reuse).abs() > 1e-3, "batch {batch} vs reuse {reuse}");
    }

    #[test]
    fn forest_contributes_vote_fraction() {
        let (features, labels) = separable();
        let model = config()
            .with_query_scaling(QueryScaling::TrainingStatistics)
            .fit(&features, &labels)
            .unwrap();
        // Positive side on column 0, negative side on column 1: trees disagree.
        let row = vec![vec![10.0, 40.0, 1.0]];
        let fraction = model.forest.positive_vote_fraction(&row).unwrap()[0];
        assert!(fraction > 0.0 && fraction < 1.0, "fraction {fraction}");

        let scaled = model.standardizer.apply(&row).unwrap();
        let w = model.weights();
        let lr = model.logistic.positive_probability(&scaled).unwrap()[0];
        let svm = model.svm.predict(&scaled).unwrap()[0] as f64;
        let expected = w.logistic_regression * lr + w.random_forest * fraction + w.svm * svm;
        let p = model.predict_proba(&row).unwrap()[0].positive();
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn non_finite_query_rejected() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        let err = model.predict(&[vec![1.0, f64::NAN, 1.0]]).unwrap_err();
        assert!(matches!(
            err,
            MlError::NonFiniteValue {
                sample_index: 0,
                feature_index: 1
            }
        ));
    }

    #[test]
    fn empty_batch_predicts_nothing() {
        let (features, labels) = separable();
        let model = config().fit(&features, &labels).unwrap();
        assert!(model.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn member_failure_is_named() {
        let (features, labels) = separable();
        let err = config()
            .with_svm(SvmConfig::new().with_max_iter(0))
            .fit(&features, &labels)
            .unwrap_err();
        match err {
            MlError::EnsembleMember { model, source } => {
                assert_eq!(model, "Support Vector Machine");
                assert!(matches!(*source, MlError::InvalidIterationCount { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
