use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use cardiorisk_io::{ExperimentName, PatientReader, ResultWriter};
use cardiorisk_ml::{
    BlendWeights, Classifier, CrossValidation, EnsembleConfig, Estimator, ModelComparison,
    ModelKind, ProbabilisticClassifier, QueryScaling, RandomForestConfig, RiskAssessment, RiskLevel,
};

#[derive(Parser)]
#[command(name = "cardiorisk")]
#[command(about = "Heart-disease risk classification: model comparison, cross-validation and ensemble prediction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train every model on one split and rank them by test accuracy
    Compare {
        /// Path to the labelled patient CSV file
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Fraction of rows held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Number of cross-validation folds on the training split
        #[arg(long, default_value_t = 5)]
        cv_folds: usize,

        /// Add degree-2 polynomial terms for logistic regression and SVM
        #[arg(long, default_value_t = false)]
        polynomial: bool,
    },

    /// K-fold cross-validation accuracy for a single model
    CrossValidate {
        /// Path to the labelled patient CSV file
        #[arg(long)]
        data: PathBuf,

        /// Model: logistic-regression, decision-tree, knn, random-forest, svm or ensemble
        #[arg(long)]
        model: ModelKind,

        /// Number of folds
        #[arg(long, default_value_t = 5)]
        folds: usize,
    },

    /// Fit the ensemble on labelled rows and assess risk for new patients
    Predict {
        /// Path to the labelled training CSV file; without it, risk comes from the rule-based score
        #[arg(long)]
        train: Option<PathBuf>,

        /// Path to the patient CSV file (target column optional)
        #[arg(long)]
        patients: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Standardize patients with training statistics instead of batch statistics
        #[arg(long, default_value_t = false)]
        reuse_training_scaling: bool,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct CompareOutput {
    experiment: String,
    n_samples: usize,
    n_train: usize,
    n_test: usize,
    best_model: Option<&'static str>,
    best_accuracy: Option<f64>,
    n_failed: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct CrossValidateOutput {
    model: &'static str,
    n_samples: usize,
    n_folds: usize,
    mean_accuracy: f64,
    std_accuracy: f64,
    fold_accuracies: Vec<f64>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_train: usize,
    n_patients: usize,
    n_high_risk: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    weights: Option<BlendWeights>,
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Compare {
            data,
            experiment,
            output_dir,
            test_fraction,
            cv_folds,
            polynomial,
        } => {
            let experiment = ExperimentName::new(experiment).context("invalid experiment name")?;
            let (features, labels) = PatientReader::new(&data)
                .read_labelled()
                .context("failed to read patient CSV")?;
            info!(n_samples = features.len(), "dataset loaded");

            let report = ModelComparison::new()
                .with_test_fraction(test_fraction)
                .with_cv_folds(cv_folds)
                .with_seed(cli.seed)
                .with_polynomial(polynomial)
                .run(&features, &labels)
                .context("model comparison failed")?;
            for failure in &report.failures {
                warn!(model = %failure.kind, error = %failure.error, "model failed");
            }

            let writer = ResultWriter::new(&output_dir, experiment.clone())
                .context("failed to prepare output directory")?;
            let output = writer
                .write_comparison(&report)
                .context("failed to write comparison")?;

            let best = report.best();
            let summary = CompareOutput {
                experiment: experiment.to_string(),
                n_samples: features.len(),
                n_train: report.n_train,
                n_test: report.n_test,
                best_model: best.map(|e| e.model),
                best_accuracy: best.map(|e| e.metrics.accuracy),
                n_failed: report.failures.len(),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::CrossValidate {
            data,
            model,
            folds,
        } => {
            let (features, labels) = PatientReader::new(&data)
                .read_labelled()
                .context("failed to read patient CSV")?;
            info!(n_samples = features.len(), model = %model, "dataset loaded");

            let cv = CrossValidation::new(folds).context("invalid fold count")?;
            let result = model
                .cross_validate(&cv, &features, &labels, cli.seed)
                .context("cross-validation failed")?;

            let summary = CrossValidateOutput {
                model: model.name(),
                n_samples: result.n_samples,
                n_folds: result.n_folds,
                mean_accuracy: result.mean_accuracy,
                std_accuracy: result.std_accuracy,
                fold_accuracies: result.fold_accuracies,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Predict {
            train,
            patients,
            experiment,
            output_dir,
            reuse_training_scaling,
        } => {
            let experiment = ExperimentName::new(experiment).context("invalid experiment name")?;
            let patients = PatientReader::new(&patients)
                .read()
                .context("failed to read patient CSV")?;

            let (n_train, weights, assessments) = match train {
                Some(train) => {
                    let (features, labels) = PatientReader::new(&train)
                        .read_labelled()
                        .context("failed to read training CSV")?;
                    info!(
                        n_train = features.len(),
                        n_patients = patients.n_samples(),
                        "datasets loaded"
                    );

                    let query_scaling = if reuse_training_scaling {
                        QueryScaling::TrainingStatistics
                    } else {
                        QueryScaling::BatchStatistics
                    };
                    let model = EnsembleConfig::new()
                        .with_forest(RandomForestConfig::new().with_seed(cli.seed))
                        .with_query_scaling(query_scaling)
                        .fit(&features, &labels)
                        .context("ensemble training failed")?;

                    let predictions = model
                        .predict(patients.features())
                        .context("prediction failed")?;
                    let probabilities = model
                        .predict_proba(patients.features())
                        .context("prediction failed")?;
                    let assessments = patients
                        .features()
                        .iter()
                        .zip(predictions.into_iter().zip(probabilities))
                        .map(|(row, (label, p))| RiskAssessment::for_patient(row, label, p.positive()))
                        .collect::<Result<Vec<_>, _>>()
                        .context("risk assessment failed")?;
                    (features.len(), Some(model.weights()), assessments)
                }
                None => {
                    info!(
                        n_patients = patients.n_samples(),
                        "no training data, using rule-based risk"
                    );
                    let assessments = patients
                        .features()
                        .iter()
                        .map(|row| RiskAssessment::rule_based(row))
                        .collect::<Result<Vec<_>, _>>()
                        .context("risk assessment failed")?;
                    (0, None, assessments)
                }
            };

            let writer = ResultWriter::new(&output_dir, experiment.clone())
                .context("failed to prepare output directory")?;
            let output = writer
                .write_predictions(
                    weights,
                    weights.is_some() && reuse_training_scaling,
                    &assessments,
                )
                .context("failed to write predictions")?;

            let summary = PredictOutput {
                experiment: experiment.to_string(),
                n_train,
                n_patients: assessments.len(),
                n_high_risk: assessments
                    .iter()
                    .filter(|a| a.risk_level == RiskLevel::High)
                    .count(),
                weights,
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
