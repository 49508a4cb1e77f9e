//! Binary heart-disease risk classification: preprocess, train, evaluate, blend.
//!
//! Provides hand-rolled Logistic Regression, CART Decision Tree, k-Nearest
//! Neighbors, Random Forest and linear SVM classifiers behind the
//! [`Estimator`] / [`Classifier`] traits, plus feature preprocessing,
//! confusion-matrix metrics, contiguous k-fold cross-validation, a
//! CV-weighted ensemble and a side-by-side model comparison pipeline.
//! Risk assessments band the ensemble probability and attribute a likely
//! disease type; a rule-based risk score covers the no-model case.
//! Labels are `0` (no disease) and `1` (disease).

mod compare;
mod disease_type;
mod ensemble;
mod error;
mod eval;
mod forest;
mod knn;
mod logistic;
mod metrics;
mod model;
mod node;
mod predict;
mod preprocess;
mod risk;
mod split;
mod svm;
mod tree;
mod validate;
mod vote;

pub use compare::{
    ComparisonEntry, ComparisonFailure, ComparisonReport, ModelComparison, ModelKind,
    UnknownModelKind,
};
pub use disease_type::{CLINICAL_FEATURES, DiseaseType, Severity, rule_based_risk};
pub use ensemble::{BlendWeights, EnsembleConfig, EnsembleModel, QueryScaling};
pub use error::MlError;
pub use eval::{CrossValidation, CrossValidationResult};
pub use forest::{ForestMember, RandomForest, RandomForestConfig};
pub use knn::{KNearestNeighbors, KnnConfig};
pub use logistic::{LogisticRegression, LogisticRegressionConfig};
pub use metrics::{ConfusionMatrix, Metrics, accuracy};
pub use model::{
    ClassProbabilities, Classifier, Estimator, NEGATIVE, POSITIVE, ProbabilisticClassifier,
};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use preprocess::{
    Standardizer, TrainTestSplit, polynomial_features, standardize_features, train_test_split,
};
pub use risk::{Confidence, RiskAssessment, RiskLevel};
pub use svm::{SupportVectorMachine, SvmConfig};
pub use tree::{DecisionTree, DecisionTreeConfig};
