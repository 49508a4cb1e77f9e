/// Errors from training, evaluation and preprocessing.
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    /// Returned when a dataset or label sequence has zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the label sequence and the feature matrix differ in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a label is not 0 or 1.
    #[error("label {label} at sample {sample_index} is not a binary class (0 or 1)")]
    InvalidLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The offending label value.
        label: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a prediction row has a different width than the training data.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the model was trained on.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when stored standardization statistics do not match the input width.
    #[error("standardizer holds statistics for {expected} features, input has {got}")]
    StatisticsWidthMismatch {
        /// Width of the stored mean/std vectors.
        expected: usize,
        /// Width of the input rows.
        got: usize,
    },

    /// Returned when the test fraction is not in the open interval (0, 1).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when a split would leave the training or test side empty.
    #[error("splitting {n_samples} samples at test_fraction {fraction} leaves an empty partition")]
    DegenerateSplit {
        /// Number of samples in the dataset.
        n_samples: usize,
        /// The requested test fraction.
        fraction: f64,
    },

    /// Returned when the polynomial degree is zero.
    #[error("polynomial degree must be at least 1, got {degree}")]
    InvalidPolynomialDegree {
        /// The invalid degree.
        degree: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when there are fewer samples than folds.
    #[error("{n_samples} samples cannot fill {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Number of samples in the dataset.
        n_samples: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when a fixed feature-subset size is zero or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when k is zero.
    #[error("k must be at least 1, got {k}")]
    InvalidNeighborCount {
        /// The invalid neighbor count.
        k: usize,
    },

    /// Returned when a learning rate is not a positive finite number.
    #[error("learning_rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate.
        learning_rate: f64,
    },

    /// Returned when an iteration cap is zero.
    #[error("max_iter must be at least 1, got {max_iter}")]
    InvalidIterationCount {
        /// The invalid iteration cap.
        max_iter: usize,
    },

    /// Returned when a regularization strength is negative or non-finite.
    #[error("{name} must be non-negative and finite, got {value}")]
    InvalidRegularization {
        /// Name of the offending hyperparameter.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },

    /// Returned when the convergence tolerance is negative or non-finite.
    #[error("tolerance must be non-negative and finite, got {tolerance}")]
    InvalidTolerance {
        /// The invalid tolerance.
        tolerance: f64,
    },

    /// Returned when a probability argument lies outside [0, 1].
    #[error("probability must be in [0.0, 1.0], got {probability}")]
    InvalidProbability {
        /// The invalid probability.
        probability: f64,
    },

    /// Returned when one of the ensemble members fails to train.
    #[error("ensemble member {model} failed to train")]
    EnsembleMember {
        /// Display name of the failing member.
        model: &'static str,
        /// The member's error.
        source: Box<MlError>,
    },
}
