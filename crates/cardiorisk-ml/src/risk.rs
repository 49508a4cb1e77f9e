//! Mapping a predicted probability to a risk band and a confidence label.

use std::fmt;

use crate::disease_type::{DiseaseType, rule_based_risk};
use crate::error::MlError;

/// Disease-risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum RiskLevel {
    /// p < 0.4.
    Low,
    /// 0.4 <= p < 0.7.
    Medium,
    /// p >= 0.7.
    High,
}

impl RiskLevel {
    /// Band a positive-class probability.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.7 {
            RiskLevel::High
        } else if probability >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// How far the probability sits from the decision boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Confidence {
    /// 0.3 <= p <= 0.7.
    Medium,
    /// p > 0.7 or p < 0.3.
    High,
}

impl Confidence {
    /// Confidence label for a positive-class probability.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.7 || probability < 0.3 {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        })
    }
}

/// A single patient's prediction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RiskAssessment {
    /// Predicted label, 1 = disease.
    pub prediction: usize,
    /// Positive-class probability.
    pub probability: f64,
    /// Risk band of `probability`.
    pub risk_level: RiskLevel,
    /// Confidence label of `probability`.
    pub confidence: Confidence,
    /// Most likely disease type for the patient.
    pub disease_type: DiseaseType,
}

impl RiskAssessment {
    /// Band `probability` and attach it to `prediction` and `disease_type`.
    #[must_use]
    pub fn new(prediction: usize, probability: f64, disease_type: DiseaseType) -> Self {
        Self {
            prediction,
            probability,
            risk_level: RiskLevel::from_probability(probability),
            confidence: Confidence::from_probability(probability),
            disease_type,
        }
    }

    /// Assess one raw patient row given a model's label and probability.
    ///
    /// # Errors
    ///
    /// Errors of [`DiseaseType::from_features`].
    pub fn for_patient(
        patient: &[f64],
        prediction: usize,
        probability: f64,
    ) -> Result<Self, MlError> {
        let disease_type = DiseaseType::from_features(patient, probability)?;
        Ok(Self::new(prediction, probability, disease_type))
    }

    /// Assess one raw patient row without a trained model.
    ///
    /// The probability comes from [`rule_based_risk`]; the label is 1 when it
    /// exceeds 0.5.
    ///
    /// # Errors
    ///
    /// Errors of [`rule_based_risk`].
    pub fn rule_based(patient: &[f64]) -> Result<Self, MlError> {
        let probability = rule_based_risk(patient)?;
        Self::for_patient(patient, usize::from(probability > 0.5), probability)
    }
}
