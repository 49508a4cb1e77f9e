//! Domain types for cardiorisk-io.

use crate::IoError;

/// Patient attribute columns, in the order every input CSV must use.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Optional trailing label column.
pub const TARGET_COLUMN: &str = "target";

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Patient rows read from a CSV file.
///
/// Produced by [`PatientReader`](crate::PatientReader). `features[i]` holds
/// the 13 attributes of row `i` in [`FEATURE_NAMES`] order; `labels` is
/// present only when the file carried a `target` column.
#[derive(Debug, Clone)]
pub struct PatientDataset {
    features: Vec<Vec<f64>>,
    labels: Option<Vec<usize>>,
}

impl PatientDataset {
    pub(crate) fn new(features: Vec<Vec<f64>>, labels: Option<Vec<usize>>) -> Self {
        Self { features, labels }
    }

    /// Feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Labels, if the file had a `target` column.
    #[must_use]
    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Number of patient rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Number of positive labels, if labelled.
    #[must_use]
    pub fn n_positive(&self) -> Option<usize> {
        self.labels
            .as_ref()
            .map(|l| l.iter().filter(|&&y| y == 1).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("heart-run_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "heart-run_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_path_separators() {
        let name = ExperimentName::new("../escape".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn dataset_counts_positives() {
        let ds = PatientDataset::new(vec![vec![0.0; 13]; 3], Some(vec![1, 0, 1]));
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_positive(), Some(2));
        assert!(PatientDataset::new(vec![vec![0.0; 13]], None).labels().is_none());
    }
}
