//! Accuracy regression tests for cardiorisk-ml.
//!
//! These tests pin the behaviour of the classifiers on the bundled
//! Cleveland-style patient rows and on small deterministic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use cardiorisk_ml::{
    Classifier, ConfusionMatrix, CrossValidation, EnsembleConfig, Estimator, KnnConfig,
    LogisticRegressionConfig, ModelComparison, ModelKind, ProbabilisticClassifier,
    RandomForestConfig, accuracy, standardize_features, train_test_split,
};

const HEART_CSV: &str = include_str!("../../../data/heart.csv");

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the bundled CSV: 13 feature columns followed by `target`.
fn heart_rows() -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    for line in HEART_CSV.lines().skip(1).filter(|l| !l.trim().is_empty()) {
        let values: Vec<f64> = line.split(',').map(|v| v.trim().parse().unwrap()).collect();
        assert_eq!(values.len(), 14);
        features.push(values[..13].to_vec());
        labels.push(values[13] as usize);
    }
    (features, labels)
}

/// First 30 positive and first 30 negative rows.
fn balanced_heart_rows() -> (Vec<Vec<f64>>, Vec<usize>) {
    let (features, labels) = heart_rows();
    let mut out_features = Vec::new();
    let mut out_labels = Vec::new();
    for class in [1, 0] {
        for (row, &label) in features.iter().zip(&labels) {
            if label == class && out_labels.iter().filter(|&&l| l == class).count() < 30 {
                out_features.push(row.clone());
                out_labels.push(label);
            }
        }
    }
    (out_features, out_labels)
}

/// Two noisy clusters in 6 dimensions, rows alternating by class.
fn make_classification(n_samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % 2;
        labels.push(class);
        let row: Vec<f64> = (0..6)
            .map(|f| {
                let base = if f < 2 { class as f64 * 2.0 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    (features, labels)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn logistic_regression_fits_heart_rows() {
    let (features, labels) = balanced_heart_rows();
    assert_eq!(labels.iter().filter(|&&l| l == 1).count(), 30);
    assert_eq!(labels.len(), 60);

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let split = train_test_split(&features, &labels, 0.2, &mut rng).unwrap();
    assert_eq!(split.train_labels.len(), 48);
    assert_eq!(split.test_labels.len(), 12);

    let (train_std, _) = standardize_features(&split.train_features).unwrap();
    let model = LogisticRegressionConfig::new()
        .fit(&train_std, &split.train_labels)
        .unwrap();
    let train_accuracy = accuracy(&split.train_labels, &model.predict(&train_std).unwrap()).unwrap();

    assert!(
        train_accuracy >= 0.7,
        "training accuracy {train_accuracy} < 0.7"
    );
}

#[test]
fn two_row_standardization() {
    let (scaled, standardizer) = standardize_features(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert_eq!(standardizer.mean(), &[2.0, 3.0]);
    assert_eq!(standardizer.std(), &[1.0, 1.0]);
    assert_eq!(scaled, vec![vec![-1.0, -1.0], vec![1.0, 1.0]]);
}

#[test]
fn one_nearest_neighbor_picks_closest() {
    let model = KnnConfig::new()
        .with_k(1)
        .fit(&[vec![0.0, 0.0], vec![10.0, 10.0]], &[0, 1])
        .unwrap();
    assert_eq!(model.predict(&[vec![1.0, 1.0]]).unwrap(), vec![0]);
}

#[test]
fn ensemble_weights_sum_to_one_on_heart_rows() {
    let (features, labels) = heart_rows();
    let model = EnsembleConfig::new()
        .with_forest(RandomForestConfig::new().with_n_trees(25))
        .fit(&features, &labels)
        .unwrap();
    assert!((model.weights().sum() - 1.0).abs() < 1e-9);

    let probabilities = model.predict_proba(&features).unwrap();
    assert_eq!(probabilities.len(), features.len());
    for p in &probabilities {
        assert!((p.negative() + p.positive() - 1.0).abs() < 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn split_partitions_every_row_once() {
    let features: Vec<Vec<f64>> = (0..37).map(|i| vec![f64::from(i)]).collect();
    let labels: Vec<usize> = (0..37).map(|i| i % 2).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let split = train_test_split(&features, &labels, 0.3, &mut rng).unwrap();

    let mut seen: Vec<usize> = split
        .train_features
        .iter()
        .chain(&split.test_features)
        .map(|row| row[0] as usize)
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..37).collect::<Vec<_>>());

    for (row, &label) in split
        .train_features
        .iter()
        .zip(&split.train_labels)
        .chain(split.test_features.iter().zip(&split.test_labels))
    {
        assert_eq!(row[0] as usize % 2, label);
    }
}

#[test]
fn forest_predicts_one_binary_label_per_row() {
    let (features, labels) = make_classification(120, 3);
    let forest = RandomForestConfig::new()
        .with_n_trees(30)
        .fit(&features, &labels)
        .unwrap();
    let predictions = forest.predict(&features).unwrap();
    assert_eq!(predictions.len(), features.len());
    assert!(predictions.iter().all(|&p| p <= 1));
    assert_eq!(predictions, forest.predict(&features).unwrap());
}

#[test]
fn auc_is_half_for_single_class_truth() {
    let cm = ConfusionMatrix::from_labels(&[1, 1, 1, 1], &[1, 0, 1, 0]).unwrap();
    assert_eq!(cm.auc(), 0.5);
}

#[test]
fn forest_cross_validation_above_threshold() {
    let (features, labels) = make_classification(200, 42);
    let cv = CrossValidation::new(5).unwrap();
    let result = cv
        .evaluate(&RandomForestConfig::new().with_n_trees(40), &features, &labels)
        .unwrap();
    assert!(
        result.mean_accuracy > 0.85,
        "cv mean_accuracy {} <= 0.85",
        result.mean_accuracy
    );
}

#[test]
fn comparison_runs_every_model_on_heart_rows() {
    let (features, labels) = heart_rows();
    let report = ModelComparison::new().run(&features, &labels).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.entries.len(), ModelKind::all().len());
    assert_eq!(report.n_train + report.n_test, features.len());
    for entry in &report.entries {
        let cv = entry.metrics.cross_val_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&cv));
    }
}

#[test]
fn comparison_is_reproducible_for_a_seed() {
    let (features, labels) = heart_rows();
    let models = vec![ModelKind::DecisionTree, ModelKind::RandomForest];
    let a = ModelComparison::new()
        .with_models(models.clone())
        .run(&features, &labels)
        .unwrap();
    let b = ModelComparison::new()
        .with_models(models)
        .run(&features, &labels)
        .unwrap();
    let accs = |r: &cardiorisk_ml::ComparisonReport| {
        r.entries
            .iter()
            .map(|e| (e.kind, e.metrics.accuracy))
            .collect::<Vec<_>>()
    };
    assert_eq!(accs(&a), accs(&b));
}
