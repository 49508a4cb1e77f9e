//! Shared input validation for training and prediction entry points.

use crate::error::MlError;

/// Validate a row-major feature matrix and return its width.
///
/// Every row must match the width of the first row and every value must be
/// finite.
pub(crate) fn check_features(features: &[Vec<f64>]) -> Result<usize, MlError> {
    let Some(first) = features.first() else {
        return Err(MlError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(MlError::ZeroFeatures);
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(MlError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(MlError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    Ok(n_features)
}

/// Validate that every label is 0 or 1.
pub(crate) fn check_labels(labels: &[usize]) -> Result<(), MlError> {
    match labels.iter().position(|&l| l > 1) {
        Some(sample_index) => Err(MlError::InvalidLabel {
            sample_index,
            label: labels[sample_index],
        }),
        None => Ok(()),
    }
}

/// Validate a labelled training set and return its feature width.
pub(crate) fn check_training_data(
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<usize, MlError> {
    let n_features = check_features(features)?;
    if labels.len() != features.len() {
        return Err(MlError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    check_labels(labels)?;
    Ok(n_features)
}

/// Validate every prediction row against the fitted width.
///
/// Rows must have exactly `n_features` finite values. An empty batch is valid.
pub(crate) fn check_prediction_input(
    features: &[Vec<f64>],
    n_features: usize,
) -> Result<(), MlError> {
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(MlError::PredictionFeatureMismatch {
                expected: n_features,
                got: row.len(),
            });
        }
        check_finite_row(sample_index, row)?;
    }
    Ok(())
}

/// Reject NaN or infinite values in one row.
pub(crate) fn check_finite_row(sample_index: usize, row: &[f64]) -> Result<(), MlError> {
    match row.iter().position(|v| !v.is_finite()) {
        Some(feature_index) => Err(MlError::NonFiniteValue {
            sample_index,
            feature_index,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matrix_rejected() {
        assert!(matches!(check_features(&[]), Err(MlError::EmptyDataset)));
    }

    #[test]
    fn zero_width_rejected() {
        let features = vec![vec![], vec![]];
        assert!(matches!(check_features(&features), Err(MlError::ZeroFeatures)));
    }

    #[test]
    fn ragged_rows_rejected() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        let err = check_features(&features).unwrap_err();
        assert!(matches!(
            err,
            MlError::FeatureCountMismatch {
                expected: 2,
                got: 1,
                sample_index: 1
            }
        ));
    }

    #[test]
    fn infinite_value_rejected() {
        let features = vec![vec![1.0, f64::INFINITY]];
        let err = check_features(&features).unwrap_err();
        assert!(matches!(
            err,
            MlError::NonFiniteValue {
                sample_index: 0,
                feature_index: 1
            }
        ));
    }

    #[test]
    fn label_length_mismatch_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let err = check_training_data(&features, &[0]).unwrap_err();
        assert!(matches!(
            err,
            MlError::LabelCountMismatch {
                n_samples: 2,
                n_labels: 1
            }
        ));
    }

    #[test]
    fn non_binary_label_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let err = check_training_data(&features, &[0, 2]).unwrap_err();
        assert!(matches!(
            err,
            MlError::InvalidLabel {
                sample_index: 1,
                label: 2
            }
        ));
    }

    #[test]
    fn valid_training_data_returns_width() {
        let features = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        assert_eq!(check_training_data(&features, &[0, 1]).unwrap(), 3);
    }

    #[test]
    fn prediction_width_checked() {
        let err = check_prediction_input(&[vec![1.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            MlError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
        assert!(check_prediction_input(&[], 2).is_ok());
    }

    #[test]
    fn prediction_rows_must_be_finite() {
        let features = vec![vec![1.0, 2.0], vec![3.0, f64::NAN]];
        let err = check_prediction_input(&features, 2).unwrap_err();
        assert!(matches!(
            err,
            MlError::NonFiniteValue {
                sample_index: 1,
                feature_index: 1
            }
        ));
        let err = check_prediction_input(&[vec![f64::NEG_INFINITY, 0.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            MlError::NonFiniteValue {
                sample_index: 0,
                feature_index: 0
            }
        ));
    }
}
