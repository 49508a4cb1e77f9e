use crate::model::POSITIVE;
use crate::node::{FeatureIndex, Impurity};

/// Gini impurity `1 - p0² - p1²` of a node holding `positives` of `n_samples`.
///
/// Returns zero for an empty node.
#[must_use]
pub(crate) fn gini(positives: usize, n_samples: usize) -> Impurity {
    if n_samples == 0 {
        return Impurity::new(0.0);
    }
    let p1 = positives as f64 / n_samples as f64;
    let p0 = 1.0 - p1;
    Impurity::new(1.0 - p0 * p0 - p1 * p1)
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `G(parent) - (nL/n)·G(L) - (nR/n)·G(R)`.
    pub(crate) gain: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Exhaustive best-split search over every feature.
///
/// For each feature, sorts the node's samples by value and evaluates the
/// midpoint between each pair of adjacent distinct values as a threshold
/// (`x <= t` goes left). The split with the strictly largest positive gain
/// wins; ties keep the first candidate found, i.e. the lowest feature index
/// and then the lowest threshold.
///
/// Returns `None` when no candidate has positive gain.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
/// `sample_indices` may repeat (bootstrap samples).
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 {
        return None;
    }

    let total_pos = sample_indices
        .iter()
        .filter(|&&si| labels[si] == POSITIVE)
        .count();
    let parent = gini(total_pos, n_samples).value();
    let n = n_samples as f64;

    let mut best_gain = 0.0;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for (feat_idx, feat_col) in features.iter().enumerate() {
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_pos = 0usize;
        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            if labels[si] == POSITIVE {
                left_pos += 1;
            }

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            let left = gini(left_pos, n_left).value();
            let right = gini(total_pos - left_pos, n_right).value();
            let gain = parent - (n_left as f64 / n) * left - (n_right as f64 / n) * right;

            if gain > best_gain {
                best_gain = gain;
                best = Some((FeatureIndex::new(feat_idx), (val_i + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        gain: best_gain,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::{find_best_split, gini};

    #[test]
    fn gini_pure() {
        assert!(gini(10, 10).is_pure());
        assert!(gini(0, 10).is_pure());
    }

    #[test]
    fn gini_balanced() {
        assert!((gini(5, 10).value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_empty_node() {
        assert!(gini(0, 0).is_pure());
    }

    #[test]
    fn separable_data_finds_correct_split() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let sample_indices: Vec<usize> = (0..6).collect();

        let split = find_best_split(&features, &labels, &sample_indices).unwrap();
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < f64::EPSILON);
        assert!((split.gain - 0.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let labels = vec![0, 0, 1, 1];
        let sample_indices: Vec<usize> = (0..4).collect();
        assert!(find_best_split(&features, &labels, &sample_indices).is_none());
    }

    #[test]
    fn equal_gain_keeps_lowest_feature() {
        // Both columns separate the classes perfectly.
        let features = vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]];
        let labels = vec![0, 0, 1, 1];
        let sample_indices: Vec<usize> = (0..4).collect();
        let split = find_best_split(&features, &labels, &sample_indices).unwrap();
        assert_eq!(split.feature.index(), 0);
    }

    #[test]
    fn single_sample_leaf_rule_allowed_by_search() {
        // The search itself does not enforce a minimum leaf size.
        let features = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let split = find_best_split(&features, &labels, &[0, 1]).unwrap();
        assert_eq!(split.left_indices.len(), 1);
        assert_eq!(split.right_indices.len(), 1);
    }

    #[test]
    fn duplicated_bootstrap_indices_are_counted() {
        let features = vec![vec![1.0, 2.0, 3.0]];
        let labels = vec![0, 1, 1];
        let split = find_best_split(&features, &labels, &[0, 0, 1, 2]).unwrap();
        assert_eq!(split.left_indices, vec![0, 0]);
        assert_eq!(split.right_indices, vec![1, 2]);
    }
}
