//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::MlError;
use crate::forest::RandomForest;
use crate::model::{ClassProbabilities, Classifier, ProbabilisticClassifier};
use crate::validate::check_prediction_input;
use crate::vote;

impl RandomForest {
    /// Count `(negative, positive)` tree votes for a single validated row.
    fn votes(&self, sample: &[f64]) -> (usize, usize) {
        vote::tally(self.members.iter().map(|m| m.vote(sample)))
    }

    /// Fraction of trees voting for the positive class, per row.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] if any row has the wrong feature count.
    pub fn positive_vote_fraction(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, MlError> {
        check_prediction_input(features, self.n_features)?;
        let n_trees = self.members.len() as f64;
        Ok(features
            .par_iter()
            .map(|sample| self.votes(sample).1 as f64 / n_trees)
            .collect())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Hard majority vote across trees; a tie goes to label 0.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        check_prediction_input(features, self.n_features)?;
        Ok(features
            .par_iter()
            .map(|sample| {
                let (neg, pos) = self.votes(sample);
                vote::majority(neg, pos)
            })
            .collect())
    }
}

impl ProbabilisticClassifier for RandomForest {
    /// Fraction of trees voting 1, and its complement.
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<ClassProbabilities>, MlError> {
        Ok(self
            .positive_vote_fraction(features)?
            .into_iter()
            .map(ClassProbabilities::from_positive)
            .collect())
    }
}
