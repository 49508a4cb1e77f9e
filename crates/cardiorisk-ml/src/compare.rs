//! Side-by-side evaluation of every model on one train/test split.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument, warn};

use crate::ensemble::EnsembleConfig;
use crate::error::MlError;
use crate::eval::{CrossValidation, CrossValidationResult};
use crate::forest::RandomForestConfig;
use crate::knn::KnnConfig;
use crate::logistic::LogisticRegressionConfig;
use crate::metrics::Metrics;
use crate::model::{Classifier, Estimator};
use crate::preprocess::{Standardizer, polynomial_features, standardize_features, train_test_split};
use crate::svm::SvmConfig;
use crate::tree::DecisionTreeConfig;

/// The model families known to the comparison pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// [`LogisticRegressionConfig`].
    LogisticRegression,
    /// [`DecisionTreeConfig`].
    DecisionTree,
    /// [`KnnConfig`].
    KNearestNeighbors,
    /// [`RandomForestConfig`].
    RandomForest,
    /// [`SvmConfig`].
    SupportVectorMachine,
    /// [`EnsembleConfig`].
    Ensemble,
}

impl ModelKind {
    /// Every kind, in reporting order before sorting.
    #[must_use]
    pub fn all() -> [ModelKind; 6] {
        [
            ModelKind::LogisticRegression,
            ModelKind::DecisionTree,
            ModelKind::KNearestNeighbors,
            ModelKind::RandomForest,
            ModelKind::SupportVectorMachine,
            ModelKind::Ensemble,
        ]
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::KNearestNeighbors => "K-Nearest Neighbors",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::SupportVectorMachine => "Support Vector Machine",
            ModelKind::Ensemble => "Ensemble Model",
        }
    }

    /// Short command-line identifier.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic-regression",
            ModelKind::DecisionTree => "decision-tree",
            ModelKind::KNearestNeighbors => "knn",
            ModelKind::RandomForest => "random-forest",
            ModelKind::SupportVectorMachine => "svm",
            ModelKind::Ensemble => "ensemble",
        }
    }

    /// Whether the model is trained on standardized features.
    ///
    /// The ensemble standardizes internally and is given raw features.
    #[must_use]
    pub fn is_standardized(self) -> bool {
        matches!(
            self,
            ModelKind::LogisticRegression
                | ModelKind::KNearestNeighbors
                | ModelKind::SupportVectorMachine
        )
    }

    /// Whether polynomial expansion applies when enabled.
    #[must_use]
    pub fn accepts_polynomial(self) -> bool {
        matches!(
            self,
            ModelKind::LogisticRegression | ModelKind::SupportVectorMachine
        )
    }

    /// Fit on the training rows, score on the test rows and cross-validate on
    /// the training rows.
    fn evaluate(self, seed: u64, cv: &CrossValidation, data: &PreparedSplit<'_>) -> Result<Metrics, MlError> {
        match self {
            ModelKind::LogisticRegression => {
                evaluate_estimator(&LogisticRegressionConfig::new(), cv, data)
            }
            ModelKind::DecisionTree => evaluate_estimator(&DecisionTreeConfig::new(), cv, data),
            ModelKind::KNearestNeighbors => evaluate_estimator(&KnnConfig::new(), cv, data),
            ModelKind::RandomForest => {
                evaluate_estimator(&RandomForestConfig::new().with_seed(seed), cv, data)
            }
            ModelKind::SupportVectorMachine => evaluate_estimator(&SvmConfig::new(), cv, data),
            ModelKind::Ensemble => evaluate_estimator(
                &EnsembleConfig::new().with_forest(RandomForestConfig::new().with_seed(seed)),
                cv,
                data,
            ),
        }
    }

    /// Cross-validate this kind on a full dataset with default hyperparameters.
    ///
    /// Standardized kinds see features standardized over the whole dataset.
    ///
    /// # Errors
    ///
    /// Any validation, fold or training error.
    pub fn cross_validate(
        self,
        cv: &CrossValidation,
        features: &[Vec<f64>],
        labels: &[usize],
        seed: u64,
    ) -> Result<CrossValidationResult, MlError> {
        let scaled;
        let x = if self.is_standardized() {
            scaled = standardize_features(features)?.0;
            &scaled
        } else {
            features
        };
        match self {
            ModelKind::LogisticRegression => {
                cv.evaluate(&LogisticRegressionConfig::new(), x, labels)
            }
            ModelKind::DecisionTree => cv.evaluate(&DecisionTreeConfig::new(), x, labels),
            ModelKind::KNearestNeighbors => cv.evaluate(&KnnConfig::new(), x, labels),
            ModelKind::RandomForest => {
                cv.evaluate(&RandomForestConfig::new().with_seed(seed), x, labels)
            }
            ModelKind::SupportVectorMachine => cv.evaluate(&SvmConfig::new(), x, labels),
            ModelKind::Ensemble => cv.evaluate(
                &EnsembleConfig::new().with_forest(RandomForestConfig::new().with_seed(seed)),
                x,
                labels,
            ),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown model identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model {0:?}; expected one of logistic-regression, decision-tree, knn, random-forest, svm, ensemble")]
pub struct UnknownModelKind(pub String);

impl FromStr for ModelKind {
    type Err = UnknownModelKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::all()
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| UnknownModelKind(s.to_string()))
    }
}

/// Train and test inputs chosen for one model.
struct PreparedSplit<'a> {
    train_features: &'a [Vec<f64>],
    train_labels: &'a [usize],
    test_features: &'a [Vec<f64>],
    test_labels: &'a [usize],
}

fn evaluate_estimator<E: Estimator>(
    estimator: &E,
    cv: &CrossValidation,
    data: &PreparedSplit<'_>,
) -> Result<Metrics, MlError> {
    let model = estimator.fit(data.train_features, data.train_labels)?;
    let predictions = model.predict(data.test_features)?;
    let mut metrics = Metrics::from_labels(data.test_labels, &predictions)?;
    let cv_result = cv.evaluate(estimator, data.train_features, data.train_labels)?;
    metrics.cross_val_accuracy = Some(cv_result.mean_accuracy);
    Ok(metrics)
}

/// Test-set metrics for one model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComparisonEntry {
    /// Which model.
    pub kind: ModelKind,
    /// Display name.
    pub model: &'static str,
    /// Trained on standardized features.
    pub standardized: bool,
    /// Trained on polynomial-expanded features.
    pub polynomial: bool,
    /// Test metrics plus CV accuracy on the training split.
    pub metrics: Metrics,
}

/// A model that failed to train or score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComparisonFailure {
    /// Which model.
    pub kind: ModelKind,
    /// Rendered error.
    pub error: String,
}

/// Output of [`ModelComparison::run`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComparisonReport {
    /// Successful models, sorted by test accuracy, best first.
    pub entries: Vec<ComparisonEntry>,
    /// Models that failed.
    pub failures: Vec<ComparisonFailure>,
    /// Rows in the training split.
    pub n_train: usize,
    /// Rows in the test split.
    pub n_test: usize,
}

impl ComparisonReport {
    /// The entry with the highest test accuracy.
    #[must_use]
    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.entries.first()
    }
}

/// Configuration for the model comparison pipeline.
///
/// # Defaults
///
/// | Parameter       | Default             |
/// |-----------------|---------------------|
/// | `test_fraction` | 0.2                 |
/// | `cv_folds`      | 5                   |
/// | `seed`          | 42                  |
/// | `polynomial`    | `false`             |
/// | `models`        | [`ModelKind::all`]  |
#[derive(Debug, Clone)]
pub struct ModelComparison {
    test_fraction: f64,
    cv_folds: usize,
    seed: u64,
    polynomial: bool,
    models: Vec<ModelKind>,
}

impl ModelComparison {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            seed: 42,
            polynomial: false,
            models: ModelKind::all().to_vec(),
        }
    }

    /// Set the fraction of rows held out for testing.
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set the number of CV folds run on the training split.
    #[must_use]
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Set the seed for the split shuffle and the forests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Expand LR and SVM inputs with degree-2 polynomial terms.
    #[must_use]
    pub fn with_polynomial(mut self, polynomial: bool) -> Self {
        self.polynomial = polynomial;
        self
    }

    /// Restrict the comparison to the given models.
    #[must_use]
    pub fn with_models(mut self, models: Vec<ModelKind>) -> Self {
        self.models = models;
        self
    }

    /// Return the test fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the number of CV folds.
    #[must_use]
    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return whether polynomial expansion is enabled.
    #[must_use]
    pub fn polynomial(&self) -> bool {
        self.polynomial
    }

    /// Split, standardize, then fit and score every configured model.
    ///
    /// The standardizer is fitted on the training split only and applied to
    /// the test split. A model that fails is logged and reported in
    /// [`ComparisonReport::failures`]; the others still run.
    ///
    /// # Errors
    ///
    /// Fails only when the data cannot be split or standardized:
    /// validation errors, [`MlError::InvalidTestFraction`],
    /// [`MlError::DegenerateSplit`] and [`MlError::InvalidFoldCount`].
    #[instrument(skip_all, fields(n_samples = features.len(), seed = self.seed))]
    pub fn run(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<ComparisonReport, MlError> {
        let cv = CrossValidation::new(self.cv_folds)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let split = train_test_split(features, labels, self.test_fraction, &mut rng)?;

        let standardizer = Standardizer::fit(&split.train_features)?;
        let train_std = standardizer.apply(&split.train_features)?;
        let test_std = standardizer.apply(&split.test_features)?;

        let (train_poly, test_poly) = if self.polynomial {
            (
                polynomial_features(&train_std, 2)?,
                polynomial_features(&test_std, 2)?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let mut entries = Vec::with_capacity(self.models.len());
        let mut failures = Vec::new();

        for &kind in &self.models {
            let polynomial = self.polynomial && kind.accepts_polynomial();
            let (train_features, test_features) = if polynomial {
                (&train_poly, &test_poly)
            } else if kind.is_standardized() {
                (&train_std, &test_std)
            } else {
                (&split.train_features, &split.test_features)
            };
            let data = PreparedSplit {
                train_features,
                train_labels: &split.train_labels,
                test_features,
                test_labels: &split.test_labels,
            };

            match kind.evaluate(self.seed, &cv, &data) {
                Ok(metrics) => {
                    info!(
                        model = kind.name(),
                        accuracy = metrics.accuracy,
                        cv_accuracy = metrics.cross_val_accuracy,
                        "model evaluated"
                    );
                    entries.push(ComparisonEntry {
                        kind,
                        model: kind.name(),
                        standardized: kind.is_standardized(),
                        polynomial,
                        metrics,
                    });
                }
                Err(e) => {
                    warn!(model = kind.name(), error = %e, "model skipped");
                    failures.push(ComparisonFailure {
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        entries.sort_by(|a, b| b.metrics.accuracy.total_cmp(&a.metrics.accuracy));

        Ok(ComparisonReport {
            entries,
            failures,
            n_train: split.train_labels.len(),
            n_test: split.test_labels.len(),
        })
    }
}

impl Default for ModelComparison {
    fn default() -> Self {
        Self::new()
    }
}
