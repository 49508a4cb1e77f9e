//! Rule-based heart-disease type attribution and risk screening.
//!
//! Both functions read a single raw patient row in the 13-column clinical
//! order `age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang,
//! oldpeak, slope, ca, thal`. No standardization is applied.

use std::fmt;

use crate::error::MlError;
use crate::validate::check_finite_row;

/// Number of clinical attributes in a patient row.
pub const CLINICAL_FEATURES: usize = 13;

const LOW_RISK_PROBABILITY: f64 = 0.2;
const LOW_RISK_SCORE: u32 = 3;
const RULE_BASED_FACTORS: f64 = 11.0;
const RULE_BASED_FLOOR: f64 = 0.05;
const RULE_BASED_CEILING: f64 = 0.95;

/// Severity label attached to each disease type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Moderate,
    High,
}

/// Most likely category of heart disease for a patient.
///
/// Variants are listed in scoring order; an unbroken tie between scores
/// resolves to the earliest variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseType {
    /// Narrowed or blocked coronary arteries.
    CoronaryArteryDisease,
    /// The heart cannot pump enough blood.
    HeartFailure,
    /// Irregular heartbeat.
    Arrhythmia,
    #[serde(rename = "heart_valve_disease")]
    ValveDisease,
    /// Disease of the heart muscle.
    Cardiomyopathy,
    /// Structural defect present from birth.
    #[serde(rename = "congenital_heart_disease")]
    Congenital,
}

impl DiseaseType {
    /// Every type, in scoring order.
    pub const ALL: [DiseaseType; 6] = [
        DiseaseType::CoronaryArteryDisease,
        DiseaseType::HeartFailure,
        DiseaseType::Arrhythmia,
        DiseaseType::ValveDisease,
        DiseaseType::Cardiomyopathy,
        DiseaseType::Congenital,
    ];

    /// Stable snake_case identifier, as written to JSON.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            DiseaseType::CoronaryArteryDisease => "coronary_artery_disease",
            DiseaseType::HeartFailure => "heart_failure",
            DiseaseType::Arrhythmia => "arrhythmia",
            DiseaseType::ValveDisease => "heart_valve_disease",
            DiseaseType::Cardiomyopathy => "cardiomyopathy",
            DiseaseType::Congenital => "congenital_heart_disease",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DiseaseType::CoronaryArteryDisease => "Coronary Artery Disease (CAD)",
            DiseaseType::HeartFailure => "Heart Failure (Congestive Heart Failure)",
            DiseaseType::Arrhythmia => "Arrhythmia (Irregular Heartbeat)",
            DiseaseType::ValveDisease => "Heart Valve Disease",
            DiseaseType::Cardiomyopathy => "Cardiomyopathy",
            DiseaseType::Congenital => "Congenital Heart Disease",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            DiseaseType::CoronaryArteryDisease
            | DiseaseType::HeartFailure
            | DiseaseType::Cardiomyopathy => Severity::High,
            DiseaseType::Arrhythmia | DiseaseType::ValveDisease | DiseaseType::Congenital => {
                Severity::Moderate
            }
        }
    }

    /// Weighted indicator score of every type for one patient, in [`DiseaseType::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`MlError::PredictionFeatureMismatch`] when the row does not
    /// have [`CLINICAL_FEATURES`] values and [`MlError::NonFiniteValue`] for
    /// a NaN or infinite value.
    pub fn scores(patient: &[f64]) -> Result<[(DiseaseType, u32); 6], MlError> {
        let p = Patient::from_row(patient)?;
        let scores = p.scores();
        Ok(std::array::from_fn(|i| (Self::ALL[i], scores[i])))
    }

    /// Attribute the most likely disease type given the patient's risk probability.
    ///
    /// The highest score wins. When `probability < 0.2` and no score reaches
    /// 3 the result is coronary artery disease. When the top two scores tie,
    /// age over 65 picks coronary artery disease, age under 40 picks
    /// congenital disease, then exercise angina picks coronary artery disease
    /// and left-ventricular hypertrophy (`restecg == 2`) picks heart failure.
    /// A tie none of those rules settle goes to the earliest tied type.
    ///
    /// # Errors
    ///
    /// The row errors of [`DiseaseType::scores`], plus
    /// [`MlError::InvalidProbability`] when `probability` is outside [0, 1].
    pub fn from_features(patient: &[f64], probability: f64) -> Result<Self, MlError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(MlError::InvalidProbability { probability });
        }
        let p = Patient::from_row(patient)?;
        let scores = p.scores();

        let mut ranked: Vec<(DiseaseType, u32)> = Self::ALL.into_iter().zip(scores).collect();
        // Stable: equal scores keep scoring order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let (top, top_score) = ranked[0];
        let runner_up = ranked[1].1;

        if probability < LOW_RISK_PROBABILITY && top_score < LOW_RISK_SCORE {
            return Ok(DiseaseType::CoronaryArteryDisease);
        }

        if top_score == runner_up {
            if p.age > 65.0 {
                return Ok(DiseaseType::CoronaryArteryDisease);
            }
            if p.age < 40.0 {
                return Ok(DiseaseType::Congenital);
            }
            if p.exercise_angina() {
                return Ok(DiseaseType::CoronaryArteryDisease);
            }
            if p.lv_hypertrophy() {
                return Ok(DiseaseType::HeartFailure);
            }
        }

        Ok(top)
    }
}

impl fmt::Display for DiseaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Positive-class probability from a count of eleven clinical risk factors.
///
/// Factors: age over 55, male, typical angina (`cp == 0`), resting blood
/// pressure over 140, cholesterol over 240, high fasting blood sugar, max
/// heart rate under 120, exercise angina, ST depression over 2, at least one
/// major vessel, and a thalassemia defect (`thal` 6 or 7). The fraction of
/// factors present is clamped to [0.05, 0.95].
///
/// # Errors
///
/// Same row errors as [`DiseaseType::scores`].
pub fn rule_based_risk(patient: &[f64]) -> Result<f64, MlError> {
    let p = Patient::from_row(patient)?;
    let factors = [
        p.age > 55.0,
        p.male(),
        p.cp == 0.0,
        p.trestbps > 140.0,
        p.chol > 240.0,
        p.fbs == 1.0,
        p.thalach < 120.0,
        p.exercise_angina(),
        p.oldpeak > 2.0,
        p.ca > 0.0,
        p.thal_defect(),
    ];
    let present = factors.iter().filter(|&&f| f).count() as f64;
    Ok((present / RULE_BASED_FACTORS).clamp(RULE_BASED_FLOOR, RULE_BASED_CEILING))
}

/// Named view over one raw patient row.
struct Patient {
    age: f64,
    sex: f64,
    cp: f64,
    trestbps: f64,
    chol: f64,
    fbs: f64,
    restecg: f64,
    thalach: f64,
    exang: f64,
    oldpeak: f64,
    slope: f64,
    ca: f64,
    thal: f64,
}

impl Patient {
    fn from_row(row: &[f64]) -> Result<Self, MlError> {
        let &[
            age,
            sex,
            cp,
            trestbps,
            chol,
            fbs,
            restecg,
            thalach,
            exang,
            oldpeak,
            slope,
            ca,
            thal,
        ] = row
        else {
            return Err(MlError::PredictionFeatureMismatch {
                expected: CLINICAL_FEATURES,
                got: row.len(),
            });
        };
        check_finite_row(0, row)?;
        Ok(Self {
            age,
            sex,
            cp,
            trestbps,
            chol,
            fbs,
            restecg,
            thalach,
            exang,
            oldpeak,
            slope,
            ca,
            thal,
        })
    }

    fn male(&self) -> bool {
        self.sex == 1.0
    }

    fn exercise_angina(&self) -> bool {
        self.exang == 1.0
    }

    fn lv_hypertrophy(&self) -> bool {
        self.restecg == 2.0
    }

    fn thal_defect(&self) -> bool {
        self.thal == 6.0 || self.thal == 7.0
    }

    /// Scores in [`DiseaseType::ALL`] order.
    fn scores(&self) -> [u32; 6] {
        let age = self.age;
        let has_chest_pain = self.cp > 0.0;
        let high_bp = self.trestbps > 140.0;
        let abnormal_ecg = self.restecg > 0.0;
        let st_abnormality = self.restecg == 1.0;
        let lvh = self.lv_hypertrophy();
        let angina = self.exercise_angina();
        let low_hr = self.thalach < 120.0;
        let very_low_hr = self.thalach < 100.0;
        let st_depression = self.oldpeak > 1.0;
        let severe_st_depression = self.oldpeak > 2.0;
        let thal_defect = self.thal_defect();

        let points = |cond: bool, n: u32| if cond { n } else { 0 };

        let cad = points(self.cp == 0.0, 4)
            + points(self.cp == 1.0, 3)
            + (if self.chol > 300.0 {
                4
            } else {
                points(self.chol > 240.0, 2)
            })
            + points(angina, 4)
            + (if self.ca > 1.0 {
                5
            } else {
                points(self.ca > 0.0, 3)
            })
            + points(severe_st_depression, 3)
            + points(age > 60.0 && self.male(), 3)
            + points(age > 65.0, 2)
            + points(self.fbs == 1.0, 2)
            + points(self.slope == 0.0, 2);

        let heart_failure = (if very_low_hr { 4 } else { points(low_hr, 2) })
            + points(high_bp, 2)
            + points(self.trestbps > 160.0, 3)
            + points(st_depression, 3)
            + points(age > 70.0, 3)
            + points(self.cp == 3.0, 2)
            + points(lvh, 4)
            + points(self.trestbps > 180.0, 3)
            + points(self.thal == 7.0, 2);

        let arrhythmia = points(st_abnormality, 4)
            + points(lvh, 2)
            + points(self.slope == 1.0, 2)
            + points(thal_defect, 2)
            + points(self.thalach > 180.0, 3)
            + points(self.thalach < 60.0 && age < 50.0, 3)
            + points(age > 75.0, 2)
            + points(high_bp && abnormal_ecg, 2);

        let valve = points(self.cp == 2.0, 3)
            + points(age > 70.0, 4)
            + points(age > 60.0, 2)
            + points(abnormal_ecg && !angina, 2)
            + points(low_hr && !angina, 3)
            + points(high_bp && age > 65.0, 2)
            + points(self.oldpeak < 1.0 && has_chest_pain, 2);

        let cardiomyopathy = (if very_low_hr { 4 } else { points(low_hr, 2) })
            + (if severe_st_depression {
                3
            } else {
                points(st_depression, 2)
            })
            + points(high_bp, 1)
            + points(lvh, 4)
            + points(self.cp == 3.0 && low_hr, 3)
            + points(age < 50.0 && (st_depression || low_hr), 3)
            + points(self.thal == 6.0, 2)
            + points(self.male() && age < 55.0, 1);

        let congenital = points(age < 40.0, 3)
            + points(age < 30.0, 2)
            + points(abnormal_ecg && age < 45.0, 2)
            + points(low_hr && age < 40.0, 2)
            + points(self.cp == 2.0 && age < 35.0, 2)
            + points(thal_defect && age < 50.0, 2);

        [cad, heart_failure, arrhythmia, valve, cardiomyopathy, congenital]
    }
}
