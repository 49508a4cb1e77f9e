//! JSON result writer for comparison and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use cardiorisk_ml::{BlendWeights, ComparisonEntry, ComparisonFailure, ComparisonReport, RiskAssessment};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes comparison and prediction results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_comparison.json` and
/// `{experiment}_predictions.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Path of the comparison artifact.
    #[must_use]
    pub fn comparison_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_comparison.json", self.experiment.as_str()))
    }

    /// Path of the predictions artifact.
    #[must_use]
    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_predictions.json", self.experiment.as_str()))
    }

    /// Write a model comparison report to `{experiment}_comparison.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_comparison(&self, report: &ComparisonReport) -> Result<PathBuf, IoError> {
        let artifact = ComparisonArtifact {
            experiment: self.experiment.as_str(),
            n_train: report.n_train,
            n_test: report.n_test,
            best_model: report.best().map(|e| e.model),
            results: &report.entries,
            failures: &report.failures,
        };

        let path = self.comparison_path();
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "comparison written");
        Ok(path)
    }

    /// Write per-patient risk assessments to `{experiment}_predictions.json`.
    ///
    /// `weights` are the blend weights of the ensemble that produced them,
    /// or `None` for rule-based assessments.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_patients = assessments.len()))]
    pub fn write_predictions(
        &self,
        weights: Option<BlendWeights>,
        training_scaling: bool,
        assessments: &[RiskAssessment],
    ) -> Result<PathBuf, IoError> {
        let predictions: Vec<PredictionEntry<'_>> = assessments
            .iter()
            .enumerate()
            .map(|(row, assessment)| PredictionEntry { row, assessment })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_patients: assessments.len(),
            n_positive: assessments.iter().filter(|a| a.prediction == 1).count(),
            method: if weights.is_some() { "ensemble" } else { "rule_based" },
            training_scaling,
            weights,
            predictions,
        };

        let path = self.predictions_path();
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ComparisonArtifact<'a> {
    experiment: &'a str,
    n_train: usize,
    n_test: usize,
    best_model: Option<&'a str>,
    results: &'a [ComparisonEntry],
    failures: &'a [ComparisonFailure],
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_patients: usize,
    n_positive: usize,
    method: &'static str,
    training_scaling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    weights: Option<BlendWeights>,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    row: usize,
    #[serde(flatten)]
    assessment: &'a RiskAssessment,
}
