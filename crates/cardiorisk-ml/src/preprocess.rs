//! Train/test splitting, standardization and polynomial expansion.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::MlError;
use crate::validate::{check_features, check_finite_row, check_training_data};

/// Disjoint train and test partitions with row/label pairing preserved.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// Training rows.
    pub train_features: Vec<Vec<f64>>,
    /// Labels of the training rows.
    pub train_labels: Vec<usize>,
    /// Held-out rows.
    pub test_features: Vec<Vec<f64>>,
    /// Labels of the held-out rows.
    pub test_labels: Vec<usize>,
}

/// Shuffle paired rows and labels, then split off a test partition.
///
/// The permutation is a uniform Fisher–Yates shuffle driven by `rng`. The
/// first `round(n * (1 - test_fraction))` shuffled rows form the training set.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | Validation errors | Empty, ragged or non-finite features; bad labels |
/// | [`MlError::InvalidTestFraction`] | `test_fraction` outside (0, 1) |
/// | [`MlError::DegenerateSplit`] | Either partition would be empty |
pub fn train_test_split(
    features: &[Vec<f64>],
    labels: &[usize],
    test_fraction: f64,
    rng: &mut impl Rng,
) -> Result<TrainTestSplit, MlError> {
    check_training_data(features, labels)?;
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }

    let n_samples = features.len();
    let n_train = (n_samples as f64 * (1.0 - test_fraction)).round() as usize;
    if n_train == 0 || n_train >= n_samples {
        return Err(MlError::DegenerateSplit {
            n_samples,
            fraction: test_fraction,
        });
    }

    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(rng);
    let (train_idx, test_idx) = order.split_at(n_train);

    let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        idx.iter()
            .map(|&i| (features[i].clone(), labels[i]))
            .unzip()
    };
    let (train_features, train_labels) = gather(train_idx);
    let (test_features, test_labels) = gather(test_idx);

    debug!(
        n_train = train_labels.len(),
        n_test = test_labels.len(),
        "train/test split"
    );

    Ok(TrainTestSplit {
        train_features,
        train_labels,
        test_features,
        test_labels,
    })
}

/// Per-column mean and population standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Standardizer {
    /// Compute column statistics over `features`.
    ///
    /// # Errors
    ///
    /// Returns the usual validation errors for an empty, ragged or
    /// non-finite matrix.
    pub fn fit(features: &[Vec<f64>]) -> Result<Self, MlError> {
        let n_features = check_features(features)?;
        let n = features.len() as f64;

        let mut mean = vec![0.0; n_features];
        for row in features {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut std = vec![0.0; n_features];
        for row in features {
            for ((s, &v), &m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        std.iter_mut().for_each(|s| *s = (*s / n).sqrt());

        Ok(Self { mean, std })
    }

    /// Build a standardizer from stored statistics.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::StatisticsWidthMismatch`] when the vectors differ in length.
    pub fn from_parts(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, MlError> {
        if mean.len() != std.len() {
            return Err(MlError::StatisticsWidthMismatch {
                expected: mean.len(),
                got: std.len(),
            });
        }
        Ok(Self { mean, std })
    }

    /// Column means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Column population standard deviations.
    #[must_use]
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Standardize `features` with the stored statistics. Zero-std columns map to 0.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::StatisticsWidthMismatch`] if a row's width differs
    /// from the stored statistics and [`MlError::NonFiniteValue`] for a NaN
    /// or infinite entry.
    pub fn apply(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, MlError> {
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != self.mean.len() {
                return Err(MlError::StatisticsWidthMismatch {
                    expected: self.mean.len(),
                    got: row.len(),
                });
            }
            check_finite_row(sample_index, row)?;
        }
        Ok(features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.std))
                    .map(|(&v, (&m, &s))| if s == 0.0 { 0.0 } else { (v - m) / s })
                    .collect()
            })
            .collect())
    }
}

/// Standardize `features` with statistics computed from `features` itself.
///
/// # Errors
///
/// Same conditions as [`Standardizer::fit`].
pub fn standardize_features(
    features: &[Vec<f64>],
) -> Result<(Vec<Vec<f64>>, Standardizer), MlError> {
    let standardizer = Standardizer::fit(features)?;
    let standardized = standardizer.apply(features)?;
    Ok((standardized, standardizer))
}

/// Append polynomial terms to every row.
///
/// Each output row is the original row, then (for `degree >= 2`) every
/// product `x_i * x_j` with `i <= j` in row-major order, then the square of
/// every original column. `degree == 1` appends only the squares.
///
/// # Errors
///
/// Returns [`MlError::InvalidPolynomialDegree`] when `degree` is 0.
pub fn polynomial_features(
    features: &[Vec<f64>],
    degree: usize,
) -> Result<Vec<Vec<f64>>, MlError> {
    if degree == 0 {
        return Err(MlError::InvalidPolynomialDegree { degree });
    }
    Ok(features
        .iter()
        .map(|row| {
            let d = row.len();
            let mut out = Vec::with_capacity(2 * d + d * (d + 1) / 2);
            out.extend_from_slice(row);
            if degree >= 2 {
                for i in 0..d {
                    for j in i..d {
                        out.push(row[i] * row[j]);
                    }
                }
            }
            out.extend(row.iter().map(|v| v * v));
            out
        })
        .collect())
}
