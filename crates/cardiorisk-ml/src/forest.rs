//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::MlError;
use crate::model::Estimator;
use crate::tree::{DecisionTree, DecisionTreeConfig, to_columns};
use crate::validate::check_training_data;

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                          |
/// |---------------------|----------------------------------|
/// | `n_trees`           | 100                              |
/// | `max_depth`         | 15                               |
/// | `min_samples_split` | 2                                |
/// | `min_samples_leaf`  | 1                                |
/// | `max_features`      | `None` (`max(1, ⌊√n_features⌋)`) |
/// | `seed`              | 42                               |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_trees: 100,
            max_depth: 15,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the number of trees.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the per-tree maximum depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the per-tree minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the per-tree minimum leaf size.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Fix the size of each tree's feature subset. `None` uses `max(1, ⌊√n_features⌋)`.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the per-tree maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the per-tree minimum samples required to split.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the per-tree minimum leaf size.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the fixed feature-subset size, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn tree_config(&self) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
    }
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the feature-subset size for `n_features` columns.
pub(crate) fn resolve_max_features(
    max_features: Option<usize>,
    n_features: usize,
) -> Result<usize, MlError> {
    let resolved =
        max_features.unwrap_or_else(|| ((n_features as f64).sqrt().floor() as usize).max(1));
    if resolved == 0 || resolved > n_features {
        return Err(MlError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw `n_samples` row indices uniformly with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Draw `k` distinct feature columns, sorted ascending.
fn feature_subset(n_features: usize, k: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut subset = index::sample(rng, n_features, k).into_vec();
    subset.sort_unstable();
    subset
}

/// One tree of the forest together with the feature columns it was trained on.
#[derive(Debug, Clone)]
pub struct ForestMember {
    pub(crate) tree: DecisionTree,
    pub(crate) features: Vec<usize>,
}

impl ForestMember {
    /// The fitted tree. Its feature indices refer to positions in [`ForestMember::features`].
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Original column indices of the tree's inputs, ascending.
    #[must_use]
    pub fn features(&self) -> &[usize] {
        &self.features
    }

    /// Predict a validated full-width row through this member.
    pub(crate) fn vote(&self, sample: &[f64]) -> usize {
        let projected: Vec<f64> = self.features.iter().map(|&f| sample[f]).collect();
        self.tree.traverse(&projected)
    }
}

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) members: Vec<ForestMember>,
    pub(crate) n_features: usize,
}

impl RandomForest {
    /// Return the trees in seed order.
    #[must_use]
    pub fn members(&self) -> &[ForestMember] {
        &self.members
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.members.len()
    }
}

impl Estimator for RandomForestConfig {
    type Model = RandomForest;

    fn name(&self) -> &'static str {
        "Random Forest"
    }

    /// Train the forest.
    ///
    /// Each tree gets its own ChaCha8 stream seeded from the master RNG, a
    /// bootstrap sample of `n` rows and a sorted random feature subset.
    /// Trees are trained in parallel and stored in seed order.
    ///
    /// # Errors
    ///
    /// Input validation errors as for [`DecisionTreeConfig`], plus
    /// [`MlError::InvalidTreeCount`] and [`MlError::InvalidMaxFeatures`].
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_samples = features.len()))]
    fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<RandomForest, MlError> {
        let n_features = check_training_data(features, labels)?;
        if self.n_trees == 0 {
            return Err(MlError::InvalidTreeCount {
                n_trees: self.n_trees,
            });
        }
        let tree_config = self.tree_config();
        tree_config.validate()?;
        let max_features = resolve_max_features(self.max_features, n_features)?;

        let n_samples = features.len();
        debug!(n_features, max_features, "training random forest");

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        let col_features = to_columns(features, n_features);

        let members: Vec<ForestMember> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap = bootstrap_sample(n_samples, &mut rng);
                let subset = feature_subset(n_features, max_features, &mut rng);
                let projected: Vec<Vec<f64>> =
                    subset.iter().map(|&f| col_features[f].clone()).collect();
                ForestMember {
                    tree: tree_config.grow(&projected, labels, &bootstrap),
                    features: subset,
                }
            })
            .collect();

        info!(n_trees = members.len(), "random forest training complete");

        Ok(RandomForest {
            members,
            n_features,
        })
    }
}
