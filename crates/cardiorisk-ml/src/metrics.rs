//! Binary confusion matrix and the classification metrics derived from it.

use std::fmt;

use crate::error::MlError;
use crate::model::POSITIVE;
use crate::validate::check_labels;

/// Confusion counts for a binary classifier, positive class = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MlError::EmptyDataset`] | Zero labels provided |
    /// | [`MlError::LabelCountMismatch`] | The two sequences differ in length |
    /// | [`MlError::InvalidLabel`] | A label in either sequence is not 0 or 1 |
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, MlError> {
        if true_labels.is_empty() {
            return Err(MlError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(MlError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        check_labels(true_labels)?;
        check_labels(predicted)?;

        let mut cm = Self {
            tp: 0,
            fp: 0,
            tn: 0,
            fn_: 0,
        };
        for (&t, &p) in true_labels.iter().zip(predicted) {
            match (t == POSITIVE, p == POSITIVE) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    /// True positives.
    #[must_use]
    pub fn true_positives(&self) -> usize {
        self.tp
    }

    /// False positives.
    #[must_use]
    pub fn false_positives(&self) -> usize {
        self.fp
    }

    /// True negatives.
    #[must_use]
    pub fn true_negatives(&self) -> usize {
        self.tn
    }

    /// False negatives.
    #[must_use]
    pub fn false_negatives(&self) -> usize {
        self.fn_
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// (TP + TN) / n.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// TP / (TP + FP). 0.0 if nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN). 0.0 if there are no true positives to find.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// TN / (TN + FP). 0.0 if there are no true negatives.
    #[must_use]
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Negative predictive value: TN / (TN + FN). 0.0 if nothing was predicted negative.
    #[must_use]
    pub fn npv(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }

    /// Harmonic mean of precision and recall. 0.0 if both are zero.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Pairwise AUC over hard labels.
    ///
    /// Among all (positive, negative) pairs of true labels, a pair counts as
    /// correctly ordered when the positive sample was predicted 1 and the
    /// negative sample predicted 0, i.e. `TP * TN` of the `P * N` pairs.
    /// Returns 0.5 when every true label is identical.
    #[must_use]
    pub fn auc(&self) -> f64 {
        let positives = self.tp + self.fn_;
        let negatives = self.tn + self.fp;
        let pairs = positives * negatives;
        if pairs == 0 {
            return 0.5;
        }
        (self.tp * self.tn) as f64 / pairs as f64
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>7} {:>7}", "", "pred_0", "pred_1")?;
        writeln!(f, "{:>8} {:>7} {:>7}", "true_0", self.tn, self.fp)?;
        writeln!(f, "{:>8} {:>7} {:>7}", "true_1", self.fn_, self.tp)
    }
}

/// Evaluation record for one model.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Metrics {
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1_score: f64,
    /// Pairwise hard-label AUC.
    pub auc: f64,
    /// TN / (TN + FP).
    pub specificity: f64,
    /// TN / (TN + FN).
    pub npv: f64,
    /// Mean k-fold accuracy, filled in by the comparison pipeline.
    pub cross_val_accuracy: Option<f64>,
}

impl Metrics {
    /// Compute every metric from true and predicted labels.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ConfusionMatrix::from_labels`].
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, MlError> {
        Ok(Self::from_confusion(&ConfusionMatrix::from_labels(
            true_labels,
            predicted,
        )?))
    }

    /// Compute every metric from an existing confusion matrix.
    #[must_use]
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: cm.f1(),
            auc: cm.auc(),
            specificity: cm.specificity(),
            npv: cm.npv(),
            cross_val_accuracy: None,
        }
    }
}

/// Fraction of positions where `predicted` equals `true_labels`.
///
/// # Errors
///
/// Same conditions as [`ConfusionMatrix::from_labels`].
pub fn accuracy(true_labels: &[usize], predicted: &[usize]) -> Result<f64, MlError> {
    Ok(ConfusionMatrix::from_labels(true_labels, predicted)?.accuracy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1];
        let m = Metrics::from_labels(&labels, &labels).unwrap();
        assert!((m.accuracy - 1.0).abs() < f64::EPSILON);
        assert!((m.precision - 1.0).abs() < f64::EPSILON);
        assert!((m.recall - 1.0).abs() < f64::EPSILON);
        assert!((m.f1_score - 1.0).abs() < f64::EPSILON);
        assert!((m.auc - 1.0).abs() < f64::EPSILON);
        assert!(m.cross_val_accuracy.is_none());
    }

    #[test]
    fn known_confusion_matrix() {
        // tp=2 fn=1 tn=3 fp=2
        let true_labels = vec![1, 1, 1, 0, 0, 0, 0, 0];
        let predicted = vec![1, 1, 0, 0, 0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted).unwrap();
        assert_eq!(cm.true_positives(), 2);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.true_negatives(), 3);
        assert_eq!(cm.false_positives(), 2);

        assert!((cm.accuracy() - 5.0 / 8.0).abs() < 1e-12);
        assert!((cm.precision() - 0.5).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.specificity() - 0.6).abs() < 1e-12);
        assert!((cm.npv() - 0.75).abs() < 1e-12);
        let f1 = 2.0 * 0.5 * (2.0 / 3.0) / (0.5 + 2.0 / 3.0);
        assert!((cm.f1() - f1).abs() < 1e-12);
        // 2*3 correct of 3*5 pairs
        assert!((cm.auc() - 6.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn auc_is_half_for_single_class() {
        let cm = ConfusionMatrix::from_labels(&[1, 1, 1], &[1, 0, 1]).unwrap();
        assert!((cm.auc() - 0.5).abs() < f64::EPSILON);
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 0]).unwrap();
        assert!((cm.auc() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_denominators_default_to_zero() {
        // nothing predicted positive, no positives present
        let m = Metrics::from_labels(&[0, 0], &[0, 0]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
        assert!((m.specificity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[]).unwrap_err();
        assert!(matches!(err, MlError::EmptyDataset));
    }

    #[test]
    fn length_mismatch_error() {
        let err = ConfusionMatrix::from_labels(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, MlError::LabelCountMismatch { .. }));
    }

    #[test]
    fn non_binary_prediction_error() {
        let err = ConfusionMatrix::from_labels(&[0, 1], &[0, 3]).unwrap_err();
        assert!(matches!(err, MlError::InvalidLabel { label: 3, .. }));
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1]).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_1"));
        assert!(output.contains("true_0"));
    }

    #[test]
    fn metrics_serialize_with_null_cv() {
        let m = Metrics::from_labels(&[0, 1], &[0, 1]).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert!(json["cross_val_accuracy"].is_null());
        assert_eq!(json["accuracy"], 1.0);
    }
}
