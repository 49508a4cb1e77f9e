use tracing::{debug, instrument};

use crate::{
    MlError,
    model::{Classifier, Estimator},
    node::{Node, NodeIndex},
    split::{find_best_split, gini},
    validate::{check_prediction_input, check_training_data},
    vote,
};

/// Configuration for a single CART decision tree (binary Gini).
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `max_depth`         | 8       |
/// | `min_samples_split` | 5       |
/// | `min_samples_leaf`  | 2       |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }

    /// Set the maximum tree depth (the root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum leaf size.
    ///
    /// A node with fewer than `2 * min_samples_leaf` samples becomes a leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Return the maximum depth limit.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum leaf size.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    pub(crate) fn validate(&self) -> Result<(), MlError> {
        if self.max_depth == 0 {
            return Err(MlError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(MlError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(MlError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }

    /// Grow a tree on pre-validated column-major data.
    ///
    /// `sample_indices` index into the columns and may contain repeats.
    pub(crate) fn grow(
        &self,
        col_features: &[Vec<f64>],
        labels: &[usize],
        sample_indices: &[usize],
    ) -> DecisionTree {
        let mut arena: Vec<Node> = Vec::new();
        build_tree(col_features, labels, sample_indices, self, 0, &mut arena);
        DecisionTree {
            nodes: arena,
            n_features: col_features.len(),
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for DecisionTreeConfig {
    type Model = DecisionTree;

    fn name(&self) -> &'static str {
        "Decision Tree"
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                  |
    /// |-------------------------------------|---------------------------------------|
    /// | [`MlError::EmptyDataset`]           | `features` is empty                   |
    /// | [`MlError::ZeroFeatures`]           | rows have zero feature columns        |
    /// | [`MlError::FeatureCountMismatch`]   | rows have inconsistent lengths        |
    /// | [`MlError::NonFiniteValue`]         | any value is NaN or infinite          |
    /// | [`MlError::LabelCountMismatch`]     | `labels.len() != features.len()`      |
    /// | [`MlError::InvalidLabel`]           | a label is not 0 or 1                 |
    /// | [`MlError::InvalidMaxDepth`]        | `max_depth` is 0                      |
    /// | [`MlError::InvalidMinSamplesSplit`] | `min_samples_split` < 2               |
    /// | [`MlError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, MlError> {
        let n_features = check_training_data(features, labels)?;
        self.validate()?;

        let col_features = to_columns(features, n_features);
        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let tree = self.grow(&col_features, labels, &sample_indices);

        let root = tree.root();
        debug!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            depth = tree.depth(),
            root_impurity = %root.impurity(),
            root_samples = root.n_samples(),
            root_gain = root.gain(),
            "decision tree built"
        );
        Ok(tree)
    }
}

/// Transpose a validated row-major matrix into column-major layout.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    col_features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    config: &DecisionTreeConfig,
    depth: usize,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();
    let (negatives, positives) = vote::tally(sample_indices.iter().map(|&si| labels[si]));
    let impurity = gini(positives, n_samples);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: vote::majority(negatives, positives),
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    };

    if impurity.is_pure()
        || depth >= config.max_depth
        || n_samples < config.min_samples_split
        || n_samples < 2 * config.min_samples_leaf
    {
        return make_leaf(arena);
    }

    let Some(split) = find_best_split(col_features, labels, sample_indices) else {
        return make_leaf(arena);
    };

    // Reserve the slot, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: 0,
        impurity,
        n_samples,
    });

    let left = build_tree(
        col_features,
        labels,
        &split.left_indices,
        config,
        depth + 1,
        arena,
    );
    let right = build_tree(
        col_features,
        labels,
        &split.right_indices,
        config,
        depth + 1,
        arena,
    );

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        n_samples,
        gain: split.gain,
    };

    NodeIndex::new(node_idx)
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>`; the root is at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the label for a single sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_sample(&self, sample: &[f64]) -> Result<usize, MlError> {
        if sample.len() != self.n_features {
            return Err(MlError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.traverse(sample))
    }

    /// Return the root node. A grown tree always has one.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return the arena nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Walk from the root to a leaf and return its prediction.
    ///
    /// The caller guarantees `sample.len() == n_features`.
    pub(crate) fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction, .. } => return *prediction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        check_prediction_input(features, self.n_features)?;
        Ok(features.iter().map(|row| self.traverse(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, MlError::EmptyDataset));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[1, 1, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert!(matches!(tree.nodes()[0], Node::Leaf { prediction: 1, .. }));
        assert_eq!(tree.predict_sample(&[2.0, 3.0]).unwrap(), 1);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.predict_sample(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict_sample(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.predict(&features).unwrap(), labels);
    }

    #[test]
    fn root_records_split_statistics() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let root = tree.root();
        assert!(!root.is_leaf());
        assert_eq!(root.n_samples(), 6);
        assert!((root.impurity().value() - 0.5).abs() < 1e-12);
        // Both children are pure, so the gain is the whole parent impurity.
        assert!((root.gain() - 0.5).abs() < 1e-12);
        assert_eq!(format!("{}", root.impurity()), "0.500000");
        for node in tree.nodes().iter().filter(|n| n.is_leaf()) {
            assert!(node.impurity().is_pure());
            assert_eq!(node.n_samples(), 3);
        }
    }

    #[test]
    fn small_node_becomes_leaf() {
        // Four samples is below the default min_samples_split of 5.
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 0, 1, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        // Tied leaf resolves to 0.
        assert_eq!(tree.predict_sample(&[3.0]).unwrap(), 0);
    }

    #[test]
    fn min_leaf_rule_forces_leaf() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(4)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn xor_root_has_no_positive_gain() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let labels = vec![0, 1, 1, 0, 0, 1, 1, 0];
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(1)
            .fit(&features, &labels)
            .unwrap();
        // No single split has positive gain on XOR, so the root stays a leaf.
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn max_depth_limits_tree() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let labels: Vec<usize> = (0..20).map(|i| (i / 2) % 2).collect();
        let tree = DecisionTreeConfig::new()
            .with_max_depth(2)
            .with_min_samples_split(2)
            .with_min_samples_leaf(1)
            .fit(&features, &labels)
            .unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn predict_is_idempotent() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.predict(&features).unwrap(), tree.predict(&features).unwrap());
    }

    #[test]
    fn prediction_feature_mismatch() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let err = tree.predict(&[vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            MlError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let (features, labels) = separable();
        let err = DecisionTreeConfig::new()
            .with_max_depth(0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidMaxDepth { max_depth: 0 }));
        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidMinSamplesSplit { .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let features = vec![vec![1.0, f64::NAN], vec![3.0, 4.0]];
        let err = DecisionTreeConfig::new().fit(&features, &[0, 1]).unwrap_err();
        assert!(matches!(err, MlError::NonFiniteValue { .. }));
    }
}
